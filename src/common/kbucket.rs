//! XOR-distance trie of k-buckets.
//!
//! The tree starts as a single bucket covering the whole keyspace. When the
//! bucket covering the local node's own key fills up, it splits by the next
//! bit of the distance key into two children, and the child that does not
//! contain the local key is marked as not splittable. Full buckets that can
//! not split reject new contacts and hand back a [Ping] signal instead, so
//! the owner can decide whether stale contacts should make room.

use std::fmt::{self, Debug, Formatter};
use std::slice::Iter;

use crate::common::{Id, PeerId, ID_BITS};

/// K = the default maximum size of a k-bucket.
pub const MAX_BUCKET_SIZE_K: usize = 20;

/// Default number of least recently seen contacts carried by a [Ping] signal.
pub const DEFAULT_PING_COUNT: usize = 3;

#[derive(Clone, PartialEq, Eq)]
/// A peer and its cached distance key.
pub struct Contact {
    id: Id,
    peer: PeerId,
}

impl Contact {
    /// Create a contact, deriving the distance key from the peer identifier.
    pub fn new(peer: PeerId) -> Self {
        Self {
            id: Id::from_peer_id(&peer),
            peer,
        }
    }

    /// Create a contact with an explicit distance key.
    pub fn with_id(id: Id, peer: PeerId) -> Self {
        Self { id, peer }
    }

    // === Getters ===

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub fn into_peer(self) -> PeerId {
        self.peer
    }
}

impl Debug for Contact {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Contact({}, {})", self.peer, self.id)
    }
}

/// Raised when a contact lands in a full bucket that can not split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ping {
    /// The least recently seen contacts of the full bucket, oldest first.
    pub old_contacts: Vec<Contact>,
    /// The contact that was rejected.
    pub new_contact: Contact,
}

/// Outcome of [KBucketTree::add].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The contact was appended to a bucket with room.
    Added,
    /// The contact was already present and is now the most recently seen.
    Updated,
    /// The contact has the local node's own key.
    Ignored,
    /// The destination bucket is full, see [Ping].
    Ping(Ping),
}

/// Kbuckets are similar to LRU caches that checks and evicts unresponsive nodes,
/// without dropping any responsive nodes in the process.
#[derive(Clone, Default)]
pub struct KBucket {
    /// Contacts in the k-bucket, sorted by the least recently seen.
    contacts: Vec<Contact>,
    /// Set on buckets that do not cover the local node's own key.
    dont_split: bool,
}

impl KBucket {
    // === Getters ===

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Returns `false` for buckets that reject contacts once full.
    pub fn is_splittable(&self) -> bool {
        !self.dont_split
    }

    pub fn iter(&self) -> Iter<'_, Contact> {
        self.contacts.iter()
    }

    // === Private Methods ===

    fn position(&self, id: &Id) -> Option<usize> {
        self.contacts.iter().position(|contact| contact.id == *id)
    }

    /// Replace the contact at `index` and move it to the most recently seen end.
    fn refresh(&mut self, index: usize, contact: Contact) {
        self.contacts.remove(index);
        self.contacts.push(contact);
    }
}

impl Debug for KBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KBucket{{ contacts: {}, splittable: {} }}",
            self.contacts.len(),
            !self.dont_split
        )
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(KBucket),
    Inner {
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone)]
/// Binary trie of [KBucket]s keyed by XOR distance from the local node.
pub struct KBucketTree {
    local_id: Id,
    k: usize,
    ping_count: usize,
    root: TreeNode,
}

impl KBucketTree {
    /// Create a new tree with a single empty bucket, centered on `local_id`.
    pub fn new(local_id: Id) -> Self {
        Self {
            local_id,
            k: MAX_BUCKET_SIZE_K,
            ping_count: DEFAULT_PING_COUNT,
            root: TreeNode::Leaf(KBucket::default()),
        }
    }

    // === Options ===

    /// Set the maximum number of contacts per bucket.
    pub fn with_bucket_size(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Set how many of the least recently seen contacts a [Ping] carries.
    pub fn with_ping_count(mut self, ping_count: usize) -> Self {
        self.ping_count = ping_count.max(1);
        self
    }

    // === Getters ===

    /// Returns the [Id] of this node, where the distance is measured from.
    pub fn local_id(&self) -> &Id {
        &self.local_id
    }

    pub fn bucket_size(&self) -> usize {
        self.k
    }

    // === Public Methods ===

    /// Insert a contact, or mark an existing one as the most recently seen.
    pub fn add(&mut self, contact: Contact) -> Insertion {
        if contact.id == self.local_id {
            // Do not add self to the routing table
            return Insertion::Ignored;
        }

        add_at(
            &mut self.root,
            contact,
            0,
            &Params {
                local_id: self.local_id,
                k: self.k,
                ping_count: self.ping_count,
            },
        )
    }

    /// Remove the contact with the given key, returning it if it was present.
    pub fn remove(&mut self, id: &Id) -> Option<Contact> {
        let bucket = self.leaf_mut(id);
        let index = bucket.position(id)?;

        Some(bucket.contacts.remove(index))
    }

    /// Returns the contact stored under exactly this key.
    pub fn get(&self, id: &Id) -> Option<&Contact> {
        self.leaf(id).iter().find(|contact| contact.id == *id)
    }

    /// Returns up to `count` contacts ordered by ascending XOR distance to `key`.
    pub fn closest(&self, key: &Id, count: usize) -> Vec<Contact> {
        let mut candidates: Vec<&Contact> = Vec::with_capacity(count.min(self.k * 2));
        let mut stack = vec![(&self.root, 0_usize)];

        // Buckets are visited nearest first, so once enough candidates are
        // collected, every unvisited bucket is further than all of them.
        while let Some((node, bit_index)) = stack.pop() {
            if candidates.len() >= count {
                break;
            }

            match node {
                TreeNode::Leaf(bucket) => candidates.extend(bucket.iter()),
                TreeNode::Inner { left, right } => {
                    let (near, far) = if key.bit(bit_index) {
                        (right, left)
                    } else {
                        (left, right)
                    };

                    stack.push((far.as_ref(), bit_index + 1));
                    stack.push((near.as_ref(), bit_index + 1));
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.id.xor(key)
                .cmp(&b.id.xor(key))
                .then_with(|| a.id.cmp(&b.id))
        });

        candidates.into_iter().take(count).cloned().collect()
    }

    /// Total number of contacts across all buckets.
    pub fn count(&self) -> usize {
        self.buckets().map(KBucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets().all(KBucket::is_empty)
    }

    /// Iterate over the leaf buckets, from the all-zeros end of the keyspace.
    pub fn buckets(&self) -> Buckets<'_> {
        Buckets {
            stack: vec![&self.root],
        }
    }

    /// Iterate over every contact in the tree.
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.buckets().flat_map(KBucket::iter)
    }

    // === Private Methods ===

    fn leaf(&self, id: &Id) -> &KBucket {
        let mut node = &self.root;
        let mut bit_index = 0;

        loop {
            match node {
                TreeNode::Leaf(bucket) => return bucket,
                TreeNode::Inner { left, right } => {
                    node = if id.bit(bit_index) {
                        right.as_ref()
                    } else {
                        left.as_ref()
                    };
                    bit_index += 1;
                }
            }
        }
    }

    fn leaf_mut(&mut self, id: &Id) -> &mut KBucket {
        leaf_mut(&mut self.root, id, 0)
    }
}

struct Params {
    local_id: Id,
    k: usize,
    ping_count: usize,
}

fn add_at(node: &mut TreeNode, contact: Contact, bit_index: usize, params: &Params) -> Insertion {
    let bucket = match node {
        TreeNode::Inner { left, right } => {
            let child = if contact.id.bit(bit_index) {
                right
            } else {
                left
            };

            return add_at(child, contact, bit_index + 1, params);
        }
        TreeNode::Leaf(bucket) => bucket,
    };

    if let Some(index) = bucket.position(&contact.id) {
        bucket.refresh(index, contact);
        return Insertion::Updated;
    }

    if bucket.len() < params.k {
        bucket.contacts.push(contact);
        return Insertion::Added;
    }

    if bucket.dont_split || bit_index >= ID_BITS {
        return Insertion::Ping(Ping {
            old_contacts: bucket.iter().take(params.ping_count).cloned().collect(),
            new_contact: contact,
        });
    }

    let full = std::mem::take(bucket);
    *node = split(full, bit_index, &params.local_id);

    add_at(node, contact, bit_index, params)
}

fn leaf_mut<'a>(node: &'a mut TreeNode, id: &Id, bit_index: usize) -> &'a mut KBucket {
    match node {
        TreeNode::Leaf(bucket) => bucket,
        TreeNode::Inner { left, right } => {
            let child = if id.bit(bit_index) { right } else { left };

            leaf_mut(child, id, bit_index + 1)
        }
    }
}

/// Split a bucket by the bit at `bit_index`, keeping the recency order of its contacts.
fn split(bucket: KBucket, bit_index: usize, local_id: &Id) -> TreeNode {
    let mut left = KBucket::default();
    let mut right = KBucket::default();

    for contact in bucket.contacts {
        if contact.id.bit(bit_index) {
            right.contacts.push(contact);
        } else {
            left.contacts.push(contact);
        }
    }

    // Only the side covering the local key may keep splitting.
    if local_id.bit(bit_index) {
        left.dont_split = true;
    } else {
        right.dont_split = true;
    }

    TreeNode::Inner {
        left: Box::new(TreeNode::Leaf(left)),
        right: Box::new(TreeNode::Leaf(right)),
    }
}

/// Iterator over the leaf buckets of a [KBucketTree].
pub struct Buckets<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Buckets<'a> {
    type Item = &'a KBucket;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                TreeNode::Leaf(bucket) => return Some(bucket),
                TreeNode::Inner { left, right } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }

        None
    }
}
