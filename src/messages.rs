//! Vocabulary shared with the DHT wire protocol.
//!
//! Encoding and decoding of the messages themselves lives outside of this crate.

use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

use bytes::Bytes;

use crate::common::PeerId;

/// Protocol id of the DHT, used for liveness probes.
///
/// Must match the wire protocol version exactly, peers on any other version
/// fail to respond and get evicted.
pub const PROTOCOL_DHT: &str = "/ipfs/kad/1.0.0";

/// Names of the known message types, indexed by their wire code.
const MESSAGE_NAMES: [&str; 6] = [
    "PUT_VALUE",
    "GET_VALUE",
    "ADD_PROVIDER",
    "GET_PROVIDERS",
    "FIND_NODE",
    "PING",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Type of a DHT request or response.
pub enum MessageType {
    PutValue,
    GetValue,
    AddProvider,
    GetProviders,
    FindNode,
    Ping,
    /// A wire code this version does not know about.
    Unknown(i32),
}

impl MessageType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => MessageType::PutValue,
            1 => MessageType::GetValue,
            2 => MessageType::AddProvider,
            3 => MessageType::GetProviders,
            4 => MessageType::FindNode,
            5 => MessageType::Ping,
            code => MessageType::Unknown(code),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            MessageType::PutValue => 0,
            MessageType::GetValue => 1,
            MessageType::AddProvider => 2,
            MessageType::GetProviders => 3,
            MessageType::FindNode => 4,
            MessageType::Ping => 5,
            MessageType::Unknown(code) => *code,
        }
    }

    /// Human readable name, `None` for [MessageType::Unknown].
    pub fn name(&self) -> Option<&'static str> {
        match self {
            MessageType::Unknown(_) => None,
            known => MESSAGE_NAMES.get(known.code() as usize).copied(),
        }
    }
}

impl From<i32> for MessageType {
    fn from(code: i32) -> Self {
        MessageType::from_code(code)
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "UNKNOWN({})", self.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A peer and the addresses it can be reached at.
pub struct PeerData {
    pub id: PeerId,
    pub multiaddrs: Vec<String>,
}

impl PeerData {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            multiaddrs: Vec::new(),
        }
    }

    pub fn with_multiaddrs(mut self, multiaddrs: Vec<String>) -> Self {
        self.multiaddrs = multiaddrs;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A record returned by a peer for a GET_VALUE request.
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
    pub time_received: SystemTime,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            time_received: SystemTime::now(),
        }
    }
}
