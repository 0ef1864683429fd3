//! Liveness checks of full k-buckets.
//!
//! [Ping] signals are queued on a channel and processed one at a time by a
//! dedicated worker thread, so eviction decisions never overlap and a burst
//! of full buckets does not turn into a burst of dials. Within a round all
//! old contacts are dialed concurrently, each on its own thread and under
//! its own [TimeoutController].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, trace};

use super::SharedTable;
use crate::common::{Contact, Insertion, PeerId, Ping};
use crate::dialer::{AbortSignal, DialError, Dialer, TimeoutController};
use crate::messages::PROTOCOL_DHT;
use crate::{Error, Result};

#[derive(Debug)]
enum QueueMessage {
    Ping(Ping),
    Shutdown,
}

/// Single concurrency queue of liveness rounds.
#[derive(Debug)]
pub(super) struct PingQueue {
    sender: Sender<QueueMessage>,
    receiver: Receiver<QueueMessage>,
    worker: JoinHandle<()>,
}

impl PingQueue {
    /// Spawn the worker thread processing rounds for `table`.
    pub fn spawn(
        table: Arc<SharedTable>,
        dialer: Arc<dyn Dialer>,
        ping_timeout: Duration,
    ) -> Result<Self> {
        let (sender, receiver) = flume::unbounded();

        let worker = PingWorker {
            table,
            dialer,
            ping_timeout,
            sender: sender.clone(),
            receiver: receiver.clone(),
        };

        let worker = thread::Builder::new()
            .name(format!("kad-{}-ping-queue", worker.table.kind))
            .spawn(move || worker.run())?;

        Ok(Self {
            sender,
            receiver,
            worker,
        })
    }

    /// Queue a round behind the ones already waiting.
    pub fn push(&self, ping: Ping) {
        if !self.is_running() {
            error!(
                new_contact = %ping.new_contact.peer(),
                "Ping worker exited, k-bucket ping event will not be processed"
            );
        }

        let _ = self.sender.send(QueueMessage::Ping(ping));
    }

    /// Returns `false` once the worker thread exited.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Number of rounds waiting to start.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Drop every round that has not started yet, and let the worker exit
    /// once the round in progress, if any, is done.
    pub fn close(self) -> usize {
        let dropped = self.receiver.drain().count();
        let _ = self.sender.send(QueueMessage::Shutdown);

        dropped
    }
}

struct PingWorker {
    table: Arc<SharedTable>,
    dialer: Arc<dyn Dialer>,
    ping_timeout: Duration,
    /// Requeues signals raised while inserting a new contact.
    sender: Sender<QueueMessage>,
    receiver: Receiver<QueueMessage>,
}

impl PingWorker {
    fn run(self) {
        while let Ok(message) = self.receiver.recv() {
            match message {
                QueueMessage::Shutdown => break,
                QueueMessage::Ping(ping) => {
                    if let Err(error) = self.round(ping) {
                        error!(table = %self.table.kind, ?error, "Could not process k-bucket ping event");
                    }
                }
            }
        }

        trace!(table = %self.table.kind, "Ping queue shut down");
    }

    /// Dial every old contact, evict the ones that did not answer, and let
    /// the new contact in if anyone was evicted.
    fn round(&self, ping: Ping) -> Result<()> {
        if !self.table.is_running() {
            return Ok(());
        }

        let Ping {
            old_contacts,
            new_contact,
        } = ping;

        let (sender, receiver) = flume::bounded(old_contacts.len());
        let mut pending = PendingDials(Vec::with_capacity(old_contacts.len()));

        for (index, contact) in old_contacts.iter().enumerate() {
            let controller = TimeoutController::new(self.ping_timeout);
            let signal = controller.signal();
            pending.0.push(Some(controller));

            let dialer = self.dialer.clone();
            let peer = contact.peer().clone();
            let sender = sender.clone();

            trace!(table = %self.table.kind, %peer, "Pinging old contact");

            thread::Builder::new()
                .name("kad-ping-dial".to_string())
                .spawn(move || {
                    let result = ping_peer(dialer.as_ref(), &peer, &signal);
                    let _ = sender.send((index, result));
                })?;
        }
        drop(sender);

        let deadline = Instant::now() + self.ping_timeout;
        let mut settled = 0;
        let mut responded = 0;

        while settled < old_contacts.len() {
            match receiver.recv_deadline(deadline) {
                Ok((index, result)) => {
                    // Dropping the controller releases its timer.
                    if pending.take(index).is_none() {
                        // Already counted as timed out.
                        continue;
                    }

                    settled += 1;
                    if self.settle(&old_contacts[index], result) {
                        responded += 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    for index in 0..old_contacts.len() {
                        if let Some(controller) = pending.take(index) {
                            controller.abort();

                            settled += 1;
                            self.settle(&old_contacts[index], Err(DialError::Timeout));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::LivenessRound(
                        "a dial exited without reporting its outcome".to_string(),
                    ));
                }
            }
        }

        if responded < old_contacts.len() {
            self.admit(new_contact);
        } else {
            trace!(
                table = %self.table.kind,
                peer = %new_contact.peer(),
                "All old contacts responded, dropping new contact"
            );
        }

        self.table.report_size();

        Ok(())
    }

    /// Apply the outcome of one dial, returning `true` if the contact responded.
    fn settle(&self, contact: &Contact, result: Result<(), DialError>) -> bool {
        let responded = match result {
            Ok(()) => {
                trace!(table = %self.table.kind, peer = %contact.peer(), "Old contact responded");
                true
            }
            Err(dial_error) => {
                // Only evict while running, dials also fail when they are
                // cancelled by a shutdown.
                match self.table.remove_if_running(contact.id()) {
                    Ok(_) => {
                        error!(
                            table = %self.table.kind,
                            peer = %contact.peer(),
                            error = %dial_error,
                            "Could not ping peer"
                        );
                        debug!(
                            table = %self.table.kind,
                            peer = %contact.peer(),
                            "Evicting old contact after ping failed"
                        );
                    }
                    Err(_) => {
                        trace!(table = %self.table.kind, peer = %contact.peer(), "Table stopped, not evicting");
                    }
                }

                false
            }
        };

        self.table.report_size();

        responded
    }

    fn admit(&self, new_contact: Contact) {
        let peer = new_contact.peer().clone();

        match self.table.add_if_running(new_contact) {
            Ok(Insertion::Ping(ping)) => {
                // The bucket filled up again in the meantime.
                let _ = self.sender.send(QueueMessage::Ping(ping));
            }
            Ok(Insertion::Added | Insertion::Updated) => {
                debug!(table = %self.table.kind, %peer, "Adding new contact");
            }
            Ok(Insertion::Ignored) | Err(_) => {}
        }
    }
}

/// Dials of a round that have not settled yet, aborted if the round ends early.
struct PendingDials(Vec<Option<TimeoutController>>);

impl PendingDials {
    fn take(&mut self, index: usize) -> Option<TimeoutController> {
        self.0.get_mut(index).and_then(Option::take)
    }
}

impl Drop for PendingDials {
    fn drop(&mut self) {
        for controller in self.0.iter().flatten() {
            controller.abort();
        }
    }
}

/// Open a stream on the DHT protocol and close it right away.
fn ping_peer(dialer: &dyn Dialer, peer: &PeerId, signal: &AbortSignal) -> Result<(), DialError> {
    let stream = dialer.dial_protocol(peer, PROTOCOL_DHT, signal)?;

    stream.close()
}
