//! Dial capability consumed by the liveness checks of the
//! [RoutingTable](crate::RoutingTable).

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::PeerId;

#[derive(thiserror::Error, Debug)]
/// Errors of a single dial attempt.
pub enum DialError {
    #[error("Dial timed out")]
    /// The [AbortSignal] deadline passed before the stream was opened and closed.
    Timeout,

    #[error("Dial was aborted")]
    /// The dial was cancelled through its [AbortSignal].
    Aborted,

    #[error("Peer is unreachable: {0}")]
    /// No transport could reach the peer.
    Unreachable(String),

    #[error("Protocol negotiation failed for {0}")]
    /// The peer does not speak the requested protocol.
    ///
    /// Never raised by this crate, meant for [Dialer] implementations whose
    /// protocol negotiation failed.
    UnsupportedProtocol(String),

    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),
}

/// Opens protocol streams to remote peers.
///
/// Implementations are shared between the routing table and the rest of the
/// node, and must observe the [AbortSignal] cooperatively: once it reports
/// [AbortSignal::is_aborted], the dial should give up with
/// [DialError::Aborted] or [DialError::Timeout].
pub trait Dialer: Send + Sync + 'static {
    fn dial_protocol(
        &self,
        peer: &PeerId,
        protocol: &str,
        signal: &AbortSignal,
    ) -> Result<Box<dyn ProtocolStream>, DialError>;
}

/// A bidirectional stream opened by a [Dialer].
pub trait ProtocolStream: Send {
    /// Close both halves of the stream.
    fn close(self: Box<Self>) -> Result<(), DialError>;
}

#[derive(Debug)]
struct SignalState {
    deadline: Instant,
    aborted: AtomicBool,
    cleared: AtomicBool,
}

#[derive(Clone)]
/// Cancellation signal handed to a [Dialer], fired by its [TimeoutController].
pub struct AbortSignal(Arc<SignalState>);

impl AbortSignal {
    /// Returns `true` once the controller aborted, or the deadline passed
    /// before the controller was cleared.
    pub fn is_aborted(&self) -> bool {
        if self.0.aborted.load(Ordering::Acquire) {
            return true;
        }

        !self.0.cleared.load(Ordering::Acquire) && Instant::now() >= self.0.deadline
    }

    pub fn deadline(&self) -> Instant {
        self.0.deadline
    }

    /// Time left until the deadline, zero if it already passed.
    pub fn remaining(&self) -> Duration {
        self.0.deadline.saturating_duration_since(Instant::now())
    }
}

impl Debug for AbortSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Owns the timer behind an [AbortSignal].
///
/// The timer is released when the controller is dropped, so a dial that
/// settled in time never observes a late abort.
#[derive(Debug)]
pub struct TimeoutController {
    signal: AbortSignal,
}

impl TimeoutController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            signal: AbortSignal(Arc::new(SignalState {
                deadline: Instant::now() + timeout,
                aborted: AtomicBool::new(false),
                cleared: AtomicBool::new(false),
            })),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Fire the signal now.
    pub fn abort(&self) {
        self.signal.0.aborted.store(true, Ordering::Release);
    }

    /// Release the timer, the signal will no longer fire on its deadline.
    pub fn clear(&self) {
        self.signal.0.cleared.store(true, Ordering::Release);
    }
}

impl Drop for TimeoutController {
    fn drop(&mut self) {
        self.clear();
    }
}
