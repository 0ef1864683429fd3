//! Opaque peer identifiers.
use bytes::Bytes;
use ed25519_dalek::VerifyingKey;
use rand::Rng;
use std::fmt::{self, Debug, Display, Formatter};

/// Multihash code of the `identity` hash function.
const IDENTITY_MULTIHASH_CODE: u8 = 0x00;

/// Protobuf encoding prefix of an Ed25519 `PublicKey { Type: Ed25519, Data: [u8; 32] }`.
const ED25519_PUBLIC_KEY_PREFIX: [u8; 4] = [0x08, 0x01, 0x12, 0x20];

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Opaque, immutable identifier of a peer, compared by value.
///
/// Cloning is cheap, the bytes are reference counted.
pub struct PeerId(Bytes);

impl PeerId {
    /// Wrap the raw bytes of a peer identifier.
    pub fn from_bytes<T: Into<Bytes>>(bytes: T) -> Self {
        Self(bytes.into())
    }

    /// Identifier of a peer owning an Ed25519 key, an identity multihash
    /// of the protobuf encoded public key.
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        let mut bytes = Vec::with_capacity(2 + ED25519_PUBLIC_KEY_PREFIX.len() + 32);

        bytes.push(IDENTITY_MULTIHASH_CODE);
        bytes.push((ED25519_PUBLIC_KEY_PREFIX.len() + 32) as u8);
        bytes.extend_from_slice(&ED25519_PUBLIC_KEY_PREFIX);
        bytes.extend_from_slice(public_key.as_bytes());

        Self(bytes.into())
    }

    /// Identifier of a freshly generated Ed25519 key.
    pub fn random() -> Self {
        let secret: [u8; 32] = rand::thread_rng().gen();
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);

        Self::from_public_key(&signing_key.verifying_key())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl Debug for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ed25519_peer_id_layout() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[7; 32]);
        let public_key = signing_key.verifying_key();

        let peer = PeerId::from_public_key(&public_key);
        let bytes = peer.as_bytes();

        assert_eq!(bytes.len(), 38);
        assert_eq!(&bytes[..6], &[0x00, 0x24, 0x08, 0x01, 0x12, 0x20]);
        assert_eq!(&bytes[6..], public_key.as_bytes());
    }

    #[test]
    fn compared_by_value() {
        let a = PeerId::from_bytes(vec![1, 2, 3]);
        let b = PeerId::from_bytes(Bytes::from_static(&[1, 2, 3]));

        assert_eq!(a, b);
        assert_ne!(a, PeerId::random());
    }
}
