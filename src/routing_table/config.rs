use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::common::{DEFAULT_PING_COUNT, MAX_BUCKET_SIZE_K};

/// Default time a stale contact has to answer a liveness probe.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
/// Which network a [RoutingTable](crate::RoutingTable) tracks peers of.
///
/// Both kinds run the same logic, the kind only tags logs and metrics.
pub enum TableKind {
    /// Peers on the local network.
    Lan,
    #[default]
    /// Peers on the wide area network.
    Wan,
}

impl TableKind {
    /// Component name metrics are reported under.
    pub fn component(&self) -> &'static str {
        match self {
            TableKind::Lan => "kad-dht-lan",
            TableKind::Wan => "kad-dht-wan",
        }
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Lan => write!(f, "lan"),
            TableKind::Wan => write!(f, "wan"),
        }
    }
}

#[derive(Debug, Clone)]
/// Routing table configurations
pub struct Config {
    /// Maximum number of contacts in a k-bucket, also the default count
    /// of [RoutingTable::closest_k_peers](crate::RoutingTable::closest_k_peers).
    ///
    /// Defaults to [MAX_BUCKET_SIZE_K]
    pub k_bucket_size: usize,
    /// How long a stale contact has to open and close a stream before
    /// it is considered dead.
    ///
    /// Defaults to [DEFAULT_PING_TIMEOUT]
    pub ping_timeout: Duration,
    /// How many of the least recently seen contacts of a full bucket are
    /// pinged before a new contact can take their place.
    ///
    /// Defaults to [DEFAULT_PING_COUNT]
    pub ping_count: usize,
    /// Defaults to [TableKind::Wan]
    pub kind: TableKind,
}

impl Config {
    /// Default configurations for a table of the given kind.
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k_bucket_size: MAX_BUCKET_SIZE_K,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            ping_count: DEFAULT_PING_COUNT,
            kind: TableKind::default(),
        }
    }
}
