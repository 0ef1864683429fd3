//! Main Crate Error

#[derive(thiserror::Error, Debug)]
/// kad-dht-core crate error enum.
pub enum Error {
    /// A mutating or size-reporting operation was called on a
    /// [RoutingTable](crate::RoutingTable) before [start](crate::RoutingTable::start)
    /// or after [stop](crate::RoutingTable::stop).
    #[error("RoutingTable is not started")]
    NotStarted,

    /// Processing a whole liveness round failed, as opposed to a single dial.
    #[error("Could not process k-bucket ping round: {0}")]
    LivenessRound(String),

    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),
}

/// Alias for `Result<T, kad_dht_core::Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
