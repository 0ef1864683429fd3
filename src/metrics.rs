//! Metrics collaborator.

/// System every metric of this crate is reported under.
pub const METRICS_SYSTEM: &str = "libp2p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A single gauge update of a component.
pub struct ComponentMetric<'a> {
    pub system: &'a str,
    pub component: &'a str,
    pub metric: &'a str,
    pub value: usize,
}

/// Receives component metric updates.
///
/// Updates are fire-and-forget: implementations must not block, and any
/// failure to record a value stays inside the implementation.
///
/// Implementations must not panic either. Updates are also sent from the
/// ping worker thread of a [RoutingTable](crate::RoutingTable), and a panic
/// there ends the liveness checks of that table until it is restarted.
pub trait MetricsTracker: Send + Sync {
    fn update_component_metric(&self, metric: ComponentMetric<'_>);
}
