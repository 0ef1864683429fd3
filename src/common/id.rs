//! Kademlia distance key of a peer, or a lookup target
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Display, Formatter};

use crate::common::PeerId;

/// The size of distance keys in bytes.
pub const ID_SIZE: usize = 32;
/// The size of distance keys in bits.
pub const ID_BITS: usize = ID_SIZE * 8;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash)]
/// Kademlia distance key of a peer, or a lookup target.
///
/// Peers are placed in the keyspace by the SHA-256 digest of their
/// identifier bytes, see [Id::from_peer_id].
pub struct Id(pub [u8; ID_SIZE]);

impl Id {
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Derive the distance key of a peer.
    ///
    /// Deterministic and one way, so keys of peers and keys of content
    /// share the same keyspace.
    pub fn from_peer_id(peer: &PeerId) -> Id {
        Id::hash(peer.as_bytes())
    }

    /// SHA-256 of arbitrary bytes, as a lookup target.
    pub fn hash<T: AsRef<[u8]>>(bytes: T) -> Id {
        let digest = Sha256::digest(bytes.as_ref());

        let mut id = [0; ID_SIZE];
        id.copy_from_slice(&digest);

        Id(id)
    }

    /// Create a new Id from some bytes. Returns `None` if `bytes` is not of length
    /// [ID_SIZE].
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Option<Id> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return None;
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp.copy_from_slice(bytes);

        Some(Id(tmp))
    }

    /// Full XOR of this Id and a target Id.
    ///
    /// Comparing two results orders keys by their Kademlia distance.
    pub fn xor(&self, other: &Id) -> Id {
        let mut result = [0_u8; ID_SIZE];

        for (i, (a, b)) in self.0.iter().zip(other.0.iter()).enumerate() {
            result[i] = a ^ b;
        }

        Id(result)
    }

    /// Number of leading bits this Id shares with `other`.
    ///
    /// Equals [ID_BITS] for identical Ids.
    pub fn common_prefix_len(&self, other: &Id) -> usize {
        for i in 0..ID_SIZE {
            let a = self.0[i];
            let b = other.0[i];

            if a != b {
                return i * 8 + (a ^ b).leading_zeros() as usize;
            }
        }

        ID_BITS
    }

    /// Returns the bit at `index`, counting from the most significant bit.
    ///
    /// Bits past the end of the key read as unset.
    pub fn bit(&self, index: usize) -> bool {
        match self.0.get(index / 8) {
            Some(byte) => byte & (0b1000_0000 >> (index % 8)) != 0,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Id {
        Id(bytes)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}
