//! Observability vocabulary of DHT lookups.
//!
//! The query executor narrates each lookup as a stream of [QueryEvent]s,
//! built with the functions in this module.

mod events;

pub use events::*;
