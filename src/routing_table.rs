//! Kademlia routing table manager.
//!
//! Wraps a [KBucketTree] with a start/stop lifecycle, reports its size to a
//! [MetricsTracker], and verifies the occupants of full buckets before
//! letting new contacts replace them.

mod config;
mod ping;

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::common::{Contact, Id, Insertion, KBucketTree, PeerId};
use crate::dialer::Dialer;
use crate::metrics::{ComponentMetric, MetricsTracker, METRICS_SYSTEM};
use crate::{Error, Result};

pub use config::{Config, TableKind, DEFAULT_PING_TIMEOUT};
use ping::PingQueue;

/// Name of the gauge tracking the number of peers in the table.
pub const METRIC_ROUTING_TABLE_SIZE: &str = "routing-table-size";

/// Kademlia routing table of a DHT node.
///
/// Constructed stopped; [RoutingTable::start] allocates the k-buckets and
/// [RoutingTable::stop] discards them. Full buckets raise liveness rounds
/// that run one at a time on a background thread, dialing the least
/// recently seen contacts and evicting the ones that do not answer.
pub struct RoutingTable {
    peer_id: PeerId,
    id: Id,
    config: Config,
    dialer: Arc<dyn Dialer>,
    metrics: Option<Arc<dyn MetricsTracker>>,
    active: Option<Active>,
}

/// State that only exists between `start` and `stop`.
struct Active {
    table: Arc<SharedTable>,
    queue: PingQueue,
}

impl RoutingTable {
    /// Create a stopped routing table for the local peer.
    pub fn new(peer_id: PeerId, dialer: Arc<dyn Dialer>, config: Config) -> Self {
        RoutingTable {
            id: Id::from_peer_id(&peer_id),
            peer_id,
            config,
            dialer,
            metrics: None,
            active: None,
        }
    }

    // === Options ===

    /// Report the table size to `metrics` after every change.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsTracker>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    // === Getters ===

    /// Returns the local peer this table is centered on.
    pub fn local_peer(&self) -> &PeerId {
        &self.peer_id
    }

    /// Returns the distance key of the local peer.
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn kind(&self) -> TableKind {
        self.config.kind
    }

    pub fn k_bucket_size(&self) -> usize {
        self.config.k_bucket_size
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.active.is_some()
    }

    /// Amount of currently stored peers, 0 while stopped.
    pub fn size(&self) -> usize {
        match &self.active {
            Some(active) => active.table.size(),
            None => 0,
        }
    }

    /// Number of liveness rounds waiting behind the one in progress.
    pub fn pending_ping_rounds(&self) -> usize {
        match &self.active {
            Some(active) => active.queue.len(),
            None => 0,
        }
    }

    // === Public Methods ===

    /// Allocate empty k-buckets centered on the local peer and start
    /// accepting liveness rounds. No-op if already started.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        let kb = KBucketTree::new(self.id)
            .with_bucket_size(self.config.k_bucket_size)
            .with_ping_count(self.config.ping_count);

        let table = Arc::new(SharedTable {
            running: AtomicBool::new(true),
            kb: Mutex::new(kb),
            kind: self.config.kind,
            metrics: self.metrics.clone(),
        });

        let queue = PingQueue::spawn(table.clone(), self.dialer.clone(), self.config.ping_timeout)?;

        debug!(table = %self.config.kind, peer = %self.peer_id, "Routing table started");

        self.active = Some(Active { table, queue });

        Ok(())
    }

    /// Discard the k-buckets and every liveness round that has not started.
    ///
    /// A round already in progress keeps running until its dials settle,
    /// but no longer mutates anything. Calling this more than once is a no-op.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.table.shutdown();
            let dropped = active.queue.close();

            debug!(table = %self.config.kind, dropped, "Routing table stopped");
        }
    }

    /// Add or update the routing table with the given peer.
    ///
    /// If the peer lands in a full bucket, a liveness round is queued to
    /// decide whether it replaces one of the stale contacts.
    pub fn add(&self, peer: PeerId) -> Result<()> {
        let active = self.active.as_ref().ok_or(Error::NotStarted)?;

        let contact = Contact::new(peer);
        let id = *contact.id();
        let peer = contact.peer().clone();

        let insertion = active.table.lock().add(contact);

        match insertion {
            Insertion::Added | Insertion::Updated => {
                debug!(table = %self.config.kind, %peer, kad_id = %id, "Added peer");
            }
            Insertion::Ignored => {
                trace!(table = %self.config.kind, %peer, "Ignoring local peer");
            }
            Insertion::Ping(ping) => {
                trace!(
                    table = %self.config.kind,
                    %peer,
                    old_contacts = ping.old_contacts.len(),
                    "Bucket is full, queueing ping round"
                );
                active.queue.push(ping);
            }
        }

        active.table.report_size();

        Ok(())
    }

    /// Remove a given peer from the table.
    pub fn remove(&self, peer: &PeerId) -> Result<()> {
        let active = self.active.as_ref().ok_or(Error::NotStarted)?;

        let id = Id::from_peer_id(peer);

        if active.table.lock().remove(&id).is_some() {
            debug!(table = %self.config.kind, %peer, "Removed peer");
        }

        active.table.report_size();

        Ok(())
    }

    /// Find a specific peer by id.
    ///
    /// The closest contact to the peer's key is only returned if it is that
    /// exact peer, a near neighbour does not count.
    pub fn find(&self, peer: &PeerId) -> Option<PeerId> {
        let key = Id::from_peer_id(peer);

        self.closest_peer(&key).filter(|closest| closest == peer)
    }

    /// Retrieve the closest peer to the given key.
    pub fn closest_peer(&self, key: &Id) -> Option<PeerId> {
        self.closest_peers(key, 1).into_iter().next()
    }

    /// Retrieve the `count`-closest peers to the given key, nearest first.
    pub fn closest_peers(&self, key: &Id, count: usize) -> Vec<PeerId> {
        let Some(active) = &self.active else {
            return Vec::new();
        };

        let closest = active.table.lock().closest(key, count);

        closest.into_iter().map(Contact::into_peer).collect()
    }

    /// Retrieve the [Config::k_bucket_size] closest peers to the given key.
    pub fn closest_k_peers(&self, key: &Id) -> Vec<PeerId> {
        self.closest_peers(key, self.config.k_bucket_size)
    }

    /// Returns a snapshot of every peer in the table.
    pub fn peers(&self) -> Vec<PeerId> {
        let Some(active) = &self.active else {
            return Vec::new();
        };

        let kb = active.table.lock();

        kb.contacts().map(|contact| contact.peer().clone()).collect()
    }
}

impl Drop for RoutingTable {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Debug for RoutingTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("peer_id", &self.peer_id)
            .field("kind", &self.config.kind)
            .field("started", &self.is_started())
            .field("size", &self.size())
            .finish()
    }
}

/// The k-buckets of one start/stop lifecycle, shared with its ping worker.
struct SharedTable {
    running: AtomicBool,
    kb: Mutex<KBucketTree>,
    kind: TableKind,
    metrics: Option<Arc<dyn MetricsTracker>>,
}

impl SharedTable {
    fn lock(&self) -> MutexGuard<'_, KBucketTree> {
        self.kb.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn size(&self) -> usize {
        let kb = self.lock();

        if self.is_running() {
            kb.count()
        } else {
            0
        }
    }

    /// Flip the running flag while holding the lock, so no in-flight round
    /// can act on a decision taken before the flip.
    fn shutdown(&self) {
        let _kb = self.lock();
        self.running.store(false, Ordering::Release);
    }

    fn remove_if_running(&self, id: &Id) -> Result<Option<Contact>> {
        let mut kb = self.lock();

        if !self.is_running() {
            return Err(Error::NotStarted);
        }

        Ok(kb.remove(id))
    }

    fn add_if_running(&self, contact: Contact) -> Result<Insertion> {
        let mut kb = self.lock();

        if !self.is_running() {
            return Err(Error::NotStarted);
        }

        Ok(kb.add(contact))
    }

    fn report_size(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.update_component_metric(ComponentMetric {
                system: METRICS_SYSTEM,
                component: self.kind.component(),
                metric: METRIC_ROUTING_TABLE_SIZE,
                value: self.size(),
            });
        }
    }
}
