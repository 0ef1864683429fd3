//! Events narrating the progress of an in-flight lookup.
//!
//! Every variant is built by its own function, which fixes the variant's
//! name and type code. Builders never fail.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use bytes::Bytes;

use crate::common::PeerId;
use crate::messages::{MessageType, PeerData, Record};

/// Error carried by a [QueryErrorEvent].
pub type QueryError = Arc<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Discriminant of a [QueryEvent].
///
/// The numeric codes are part of the observable protocol.
pub enum EventType {
    SendingQuery = 0,
    PeerResponse = 1,
    FinalPeer = 2,
    QueryError = 3,
    Provider = 4,
    Value = 5,
    AddingPeer = 6,
    DialingPeer = 7,
}

impl EventType {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventType::SendingQuery => "SENDING_QUERY",
            EventType::PeerResponse => "PEER_RESPONSE",
            EventType::FinalPeer => "FINAL_PEER",
            EventType::QueryError => "QUERY_ERROR",
            EventType::Provider => "PROVIDER",
            EventType::Value => "VALUE",
            EventType::AddingPeer => "ADDING_PEER",
            EventType::DialingPeer => "DIALING_PEER",
        }
    }
}

#[derive(Debug, Clone)]
/// One externally observable step of a lookup.
pub enum QueryEvent {
    SendingQuery(SendingQueryEvent),
    PeerResponse(PeerResponseEvent),
    FinalPeer(FinalPeerEvent),
    QueryError(QueryErrorEvent),
    Provider(ProviderEvent),
    Value(ValueEvent),
    AddingPeer(AddingPeerEvent),
    DialingPeer(DialingPeerEvent),
}

impl QueryEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            QueryEvent::SendingQuery(_) => EventType::SendingQuery,
            QueryEvent::PeerResponse(_) => EventType::PeerResponse,
            QueryEvent::FinalPeer(_) => EventType::FinalPeer,
            QueryEvent::QueryError(_) => EventType::QueryError,
            QueryEvent::Provider(_) => EventType::Provider,
            QueryEvent::Value(_) => EventType::Value,
            QueryEvent::AddingPeer(_) => EventType::AddingPeer,
            QueryEvent::DialingPeer(_) => EventType::DialingPeer,
        }
    }

    /// Discriminant name, like `SENDING_QUERY`.
    pub fn name(&self) -> &'static str {
        self.event_type().name()
    }

    /// Stable numeric type code.
    pub fn type_code(&self) -> u8 {
        self.event_type().code()
    }

    /// The remote peer this event is about: the query target, the
    /// responding peer, or the peer being added or dialed.
    pub fn peer(&self) -> &PeerId {
        match self {
            QueryEvent::SendingQuery(event) => &event.to,
            QueryEvent::PeerResponse(event) => &event.from,
            QueryEvent::FinalPeer(event) => &event.from,
            QueryEvent::QueryError(event) => &event.from,
            QueryEvent::Provider(event) => &event.from,
            QueryEvent::Value(event) => &event.from,
            QueryEvent::AddingPeer(event) => &event.peer,
            QueryEvent::DialingPeer(event) => &event.peer,
        }
    }
}

impl Display for QueryEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryEvent::SendingQuery(event) => {
                write!(f, "{} {} to {}", self.name(), event.message_type, event.to)
            }
            QueryEvent::PeerResponse(event) => write!(
                f,
                "{} {} from {} (closer: {}, providers: {}, record: {})",
                self.name(),
                event.message_type,
                event.from,
                event.closer.len(),
                event.providers.len(),
                event.record.is_some()
            ),
            QueryEvent::FinalPeer(event) => {
                write!(f, "{} {} from {}", self.name(), event.peer.id, event.from)
            }
            QueryEvent::QueryError(event) => {
                write!(f, "{} from {}: {}", self.name(), event.from, event.error)
            }
            QueryEvent::Provider(event) => write!(
                f,
                "{} {} providers from {}",
                self.name(),
                event.providers.len(),
                event.from
            ),
            QueryEvent::Value(event) => write!(
                f,
                "{} {} bytes from {}",
                self.name(),
                event.value.len(),
                event.from
            ),
            QueryEvent::AddingPeer(event) => write!(f, "{} {}", self.name(), event.peer),
            QueryEvent::DialingPeer(event) => write!(f, "{} {}", self.name(), event.peer),
        }
    }
}

// === SENDING_QUERY ===

#[derive(Debug, Clone)]
pub struct SendingQueryFields {
    pub to: PeerId,
    pub message_type: MessageType,
}

#[derive(Debug, Clone)]
/// A request is about to be sent to `to`.
pub struct SendingQueryEvent {
    to: PeerId,
    message_type: MessageType,
    message_name: Option<&'static str>,
}

impl SendingQueryEvent {
    pub fn to(&self) -> &PeerId {
        &self.to
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// `None` when the message type is not known.
    pub fn message_name(&self) -> Option<&'static str> {
        self.message_name
    }
}

pub fn sending_query_event(fields: SendingQueryFields) -> QueryEvent {
    QueryEvent::SendingQuery(SendingQueryEvent {
        message_name: fields.message_type.name(),
        to: fields.to,
        message_type: fields.message_type,
    })
}

// === PEER_RESPONSE ===

#[derive(Debug, Clone)]
pub struct PeerResponseFields {
    pub from: PeerId,
    pub message_type: MessageType,
    pub closer: Option<Vec<PeerData>>,
    pub providers: Option<Vec<PeerData>>,
    pub record: Option<Record>,
}

impl PeerResponseFields {
    /// A response with no closer peers, providers or record.
    pub fn new(from: PeerId, message_type: MessageType) -> Self {
        Self {
            from,
            message_type,
            closer: None,
            providers: None,
            record: None,
        }
    }
}

#[derive(Debug, Clone)]
/// A peer answered a request.
pub struct PeerResponseEvent {
    from: PeerId,
    message_type: MessageType,
    message_name: Option<&'static str>,
    closer: Vec<PeerData>,
    providers: Vec<PeerData>,
    record: Option<Record>,
}

impl PeerResponseEvent {
    pub fn from(&self) -> &PeerId {
        &self.from
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// `None` when the message type is not known.
    pub fn message_name(&self) -> Option<&'static str> {
        self.message_name
    }

    /// Peers closer to the target, empty if none were returned.
    pub fn closer(&self) -> &[PeerData] {
        &self.closer
    }

    /// Providers of the target, empty if none were returned.
    pub fn providers(&self) -> &[PeerData] {
        &self.providers
    }

    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }
}

pub fn peer_response_event(fields: PeerResponseFields) -> QueryEvent {
    QueryEvent::PeerResponse(PeerResponseEvent {
        message_name: fields.message_type.name(),
        from: fields.from,
        message_type: fields.message_type,
        closer: fields.closer.unwrap_or_default(),
        providers: fields.providers.unwrap_or_default(),
        record: fields.record,
    })
}

// === FINAL_PEER ===

#[derive(Debug, Clone)]
pub struct FinalPeerFields {
    pub from: PeerId,
    pub peer: PeerData,
}

#[derive(Debug, Clone)]
/// The peer a lookup was searching for has been found.
pub struct FinalPeerEvent {
    from: PeerId,
    peer: PeerData,
}

impl FinalPeerEvent {
    pub fn from(&self) -> &PeerId {
        &self.from
    }

    pub fn peer(&self) -> &PeerData {
        &self.peer
    }
}

pub fn final_peer_event(fields: FinalPeerFields) -> QueryEvent {
    QueryEvent::FinalPeer(FinalPeerEvent {
        from: fields.from,
        peer: fields.peer,
    })
}

// === QUERY_ERROR ===

#[derive(Debug, Clone)]
pub struct QueryErrorFields {
    pub from: PeerId,
    pub error: QueryError,
}

#[derive(Debug, Clone)]
/// A request to `from` failed.
pub struct QueryErrorEvent {
    from: PeerId,
    error: QueryError,
}

impl QueryErrorEvent {
    pub fn from(&self) -> &PeerId {
        &self.from
    }

    pub fn error(&self) -> &QueryError {
        &self.error
    }
}

pub fn query_error_event(fields: QueryErrorFields) -> QueryEvent {
    QueryEvent::QueryError(QueryErrorEvent {
        from: fields.from,
        error: fields.error,
    })
}

// === PROVIDER ===

#[derive(Debug, Clone)]
pub struct ProviderFields {
    pub from: PeerId,
    pub providers: Vec<PeerData>,
}

#[derive(Debug, Clone)]
/// Providers of the lookup target were returned.
pub struct ProviderEvent {
    from: PeerId,
    providers: Vec<PeerData>,
}

impl ProviderEvent {
    pub fn from(&self) -> &PeerId {
        &self.from
    }

    pub fn providers(&self) -> &[PeerData] {
        &self.providers
    }
}

pub fn provider_event(fields: ProviderFields) -> QueryEvent {
    QueryEvent::Provider(ProviderEvent {
        from: fields.from,
        providers: fields.providers,
    })
}

// === VALUE ===

#[derive(Debug, Clone)]
pub struct ValueFields {
    pub from: PeerId,
    pub value: Bytes,
}

#[derive(Debug, Clone)]
/// A value for the lookup target was returned.
pub struct ValueEvent {
    from: PeerId,
    value: Bytes,
}

impl ValueEvent {
    pub fn from(&self) -> &PeerId {
        &self.from
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

pub fn value_event(fields: ValueFields) -> QueryEvent {
    QueryEvent::Value(ValueEvent {
        from: fields.from,
        value: fields.value,
    })
}

// === ADDING_PEER ===

#[derive(Debug, Clone)]
pub struct AddingPeerFields {
    pub peer: PeerId,
}

#[derive(Debug, Clone)]
/// A peer is being added to the routing table.
pub struct AddingPeerEvent {
    peer: PeerId,
}

impl AddingPeerEvent {
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }
}

pub fn adding_peer_event(fields: AddingPeerFields) -> QueryEvent {
    QueryEvent::AddingPeer(AddingPeerEvent { peer: fields.peer })
}

// === DIALING_PEER ===

#[derive(Debug, Clone)]
pub struct DialingPeerFields {
    pub peer: PeerId,
}

#[derive(Debug, Clone)]
/// A peer is being dialed.
pub struct DialingPeerEvent {
    peer: PeerId,
}

impl DialingPeerEvent {
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }
}

pub fn dialing_peer_event(fields: DialingPeerFields) -> QueryEvent {
    QueryEvent::DialingPeer(DialingPeerEvent { peer: fields.peer })
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[test]
    fn sending_query() {
        let to = PeerId::random();

        let event = sending_query_event(SendingQueryFields {
            to: to.clone(),
            message_type: MessageType::FindNode,
        });

        assert_eq!(event.name(), "SENDING_QUERY");
        assert_eq!(event.type_code(), 0);
        assert_eq!(event.peer(), &to);

        let QueryEvent::SendingQuery(event) = event else {
            panic!("expected SENDING_QUERY");
        };

        assert_eq!(event.to(), &to);
        assert_eq!(event.message_type(), MessageType::FindNode);
        assert_eq!(event.message_name(), Some("FIND_NODE"));
    }

    #[test]
    fn sending_query_with_unknown_type_has_no_name() {
        let event = sending_query_event(SendingQueryFields {
            to: PeerId::random(),
            message_type: MessageType::from(42),
        });

        let QueryEvent::SendingQuery(event) = event else {
            panic!("expected SENDING_QUERY");
        };

        assert_eq!(event.message_type(), MessageType::Unknown(42));
        assert_eq!(event.message_name(), None);
    }

    #[test]
    fn peer_response_defaults_to_empty_lists() {
        let from = PeerId::random();

        let event = peer_response_event(PeerResponseFields::new(from.clone(), MessageType::Ping));

        assert_eq!(event.name(), "PEER_RESPONSE");
        assert_eq!(event.type_code(), 1);

        let QueryEvent::PeerResponse(event) = event else {
            panic!("expected PEER_RESPONSE");
        };

        assert_eq!(event.from(), &from);
        assert_eq!(event.message_name(), Some("PING"));
        assert!(event.closer().is_empty());
        assert!(event.providers().is_empty());
        assert!(event.record().is_none());
    }

    #[test]
    fn peer_response_keeps_given_fields() {
        let closer = vec![PeerData::new(PeerId::random())];
        let providers = vec![
            PeerData::new(PeerId::random()).with_multiaddrs(vec!["/ip4/1.2.3.4/tcp/4001".into()]),
            PeerData::new(PeerId::random()),
        ];
        let record = Record::new(&b"key"[..], &b"value"[..]);

        let event = peer_response_event(PeerResponseFields {
            closer: Some(closer.clone()),
            providers: Some(providers.clone()),
            record: Some(record.clone()),
            ..PeerResponseFields::new(PeerId::random(), MessageType::GetProviders)
        });

        let QueryEvent::PeerResponse(event) = event else {
            panic!("expected PEER_RESPONSE");
        };

        assert_eq!(event.message_name(), Some("GET_PROVIDERS"));
        assert_eq!(event.closer(), closer.as_slice());
        assert_eq!(event.providers(), providers.as_slice());
        assert_eq!(event.record(), Some(&record));
    }

    #[test]
    fn final_peer() {
        let from = PeerId::random();
        let peer = PeerData::new(PeerId::random());

        let event = final_peer_event(FinalPeerFields {
            from: from.clone(),
            peer: peer.clone(),
        });

        assert_eq!(event.name(), "FINAL_PEER");
        assert_eq!(event.type_code(), 2);

        let QueryEvent::FinalPeer(event) = event else {
            panic!("expected FINAL_PEER");
        };

        assert_eq!(event.from(), &from);
        assert_eq!(event.peer(), &peer);
    }

    #[test]
    fn query_error() {
        let from = PeerId::random();

        let event = query_error_event(QueryErrorFields {
            from: from.clone(),
            error: Arc::new(ConnectionReset),
        });

        assert_eq!(event.name(), "QUERY_ERROR");
        assert_eq!(event.type_code(), 3);
        assert!(event.to_string().ends_with("connection reset"));

        let QueryEvent::QueryError(event) = event else {
            panic!("expected QUERY_ERROR");
        };

        assert_eq!(event.from(), &from);
        assert_eq!(event.error().to_string(), "connection reset");
    }

    #[test]
    fn provider() {
        let providers = vec![PeerData::new(PeerId::random())];

        let event = provider_event(ProviderFields {
            from: PeerId::random(),
            providers: providers.clone(),
        });

        assert_eq!(event.name(), "PROVIDER");
        assert_eq!(event.type_code(), 4);

        let QueryEvent::Provider(event) = event else {
            panic!("expected PROVIDER");
        };

        assert_eq!(event.providers(), providers.as_slice());
    }

    #[test]
    fn value() {
        let event = value_event(ValueFields {
            from: PeerId::random(),
            value: Bytes::from_static(b"hello"),
        });

        assert_eq!(event.name(), "VALUE");
        assert_eq!(event.type_code(), 5);

        let QueryEvent::Value(event) = event else {
            panic!("expected VALUE");
        };

        assert_eq!(event.value().as_ref(), b"hello");
    }

    #[test]
    fn adding_and_dialing_peer() {
        let peer = PeerId::random();

        let adding = adding_peer_event(AddingPeerFields { peer: peer.clone() });
        let dialing = dialing_peer_event(DialingPeerFields { peer: peer.clone() });

        assert_eq!(adding.name(), "ADDING_PEER");
        assert_eq!(adding.type_code(), 6);
        assert_eq!(adding.peer(), &peer);

        assert_eq!(dialing.name(), "DIALING_PEER");
        assert_eq!(dialing.type_code(), 7);
        assert_eq!(dialing.peer(), &peer);
    }

    #[test]
    fn type_codes_are_stable() {
        let types = [
            EventType::SendingQuery,
            EventType::PeerResponse,
            EventType::FinalPeer,
            EventType::QueryError,
            EventType::Provider,
            EventType::Value,
            EventType::AddingPeer,
            EventType::DialingPeer,
        ];

        for (code, event_type) in types.iter().enumerate() {
            assert_eq!(event_type.code() as usize, code);
        }
    }
}
