//! Fill a routing table with peers, half of which are unreachable, and
//! watch liveness rounds replace them.
//!
//! Run: `cargo run --example liveness`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use kad_dht_core::dialer::{AbortSignal, DialError, Dialer, ProtocolStream};
use kad_dht_core::{Config, Id, PeerId, RoutingTable};
use tracing::{info, Level};

/// Peers whose first key byte is even answer, the rest are unreachable.
struct EvenPeers;

struct Stream;

impl ProtocolStream for Stream {
    fn close(self: Box<Self>) -> Result<(), DialError> {
        Ok(())
    }
}

impl Dialer for EvenPeers {
    fn dial_protocol(
        &self,
        peer: &PeerId,
        _protocol: &str,
        _signal: &AbortSignal,
    ) -> Result<Box<dyn ProtocolStream>, DialError> {
        thread::sleep(Duration::from_millis(20));

        if Id::from_peer_id(peer).as_bytes()[0] % 2 == 0 {
            Ok(Box::new(Stream))
        } else {
            Err(DialError::Unreachable("no route to host".to_string()))
        }
    }
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let mut table = RoutingTable::new(PeerId::random(), Arc::new(EvenPeers), Config::default());

    if let Err(error) = table.start() {
        eprintln!("Could not start routing table: {error}");
        return;
    }

    for _ in 0..500 {
        let _ = table.add(PeerId::random());
    }

    info!(
        size = table.size(),
        pending = table.pending_ping_rounds(),
        "Added 500 peers"
    );

    while table.pending_ping_rounds() > 0 {
        thread::sleep(Duration::from_millis(100));
    }
    thread::sleep(Duration::from_millis(500));

    info!(size = table.size(), "Liveness rounds settled");

    let target = Id::random();
    for peer in table.closest_k_peers(&target) {
        info!(%peer, distance = %Id::from_peer_id(&peer).xor(&target), "Closest");
    }

    table.stop();
}
