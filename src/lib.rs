#![doc = include_str!("../README.md")]

// Public modules
mod common;
pub mod dialer;
mod error;
pub mod messages;
pub mod metrics;
pub mod query;
pub mod routing_table;

pub use crate::common::{
    Buckets, Contact, Id, Insertion, KBucket, KBucketTree, PeerId, Ping, DEFAULT_PING_COUNT,
    ID_BITS, ID_SIZE, MAX_BUCKET_SIZE_K,
};
pub use crate::error::{Error, Result};
pub use crate::routing_table::{Config, RoutingTable, TableKind};
pub use bytes::Bytes;

pub use ed25519_dalek::{SigningKey, VerifyingKey};
