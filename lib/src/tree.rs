use crate::error::PoolError;
use crate::field::Field;
use crate::hash::HashPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deepest supported tree. Leaf indices are `u64`; 32 levels keeps every
/// capacity computation far from overflow.
pub const MAX_TREE_LEVELS: usize = 32;

// =============================================================================
//                          EMPTY SUBTREES
// =============================================================================

/// Compute the zero values for each level of the Merkle tree, plus the root of
/// a fully empty tree at index `levels`:
///   zeros[0] = H(0)
///   zeros[i] = H(zeros[i-1], zeros[i-1])
pub fn compute_zeros<H: HashPrimitive>(hasher: &H, levels: usize) -> Vec<Field> {
    let mut zeros = Vec::with_capacity(levels + 1);
    zeros.push(hasher.hash(&[Field::ZERO]));
    for i in 1..=levels {
        zeros.push(hasher.hash_pair(zeros[i - 1], zeros[i - 1]));
    }
    zeros
}

/// Root of an empty tree with the given number of levels.
pub fn compute_empty_root<H: HashPrimitive>(hasher: &H, levels: usize) -> Field {
    compute_zeros(hasher, levels)[levels]
}

// =============================================================================
//                          ROOT HISTORY
// =============================================================================

/// Fixed-size ring buffer of recent roots with O(1) membership.
///
/// `counts` mirrors the live window so lookups never scan the buffer; it is
/// a multiset because nothing prevents a root from recurring.
#[derive(Clone, Debug)]
pub struct RootHistory {
    slots: Vec<Field>,
    cursor: usize,
    filled: usize,
    counts: HashMap<Field, u32>,
}

impl RootHistory {
    /// A window of `capacity` roots, seeded with `initial`.
    pub fn new(capacity: usize, initial: Field) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig("root history size must be positive".into()));
        }
        let mut slots = vec![Field::ZERO; capacity];
        slots[0] = initial;
        let mut counts = HashMap::new();
        counts.insert(initial, 1);
        Ok(Self { slots, cursor: 0, filled: 1, counts })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Append a root, evicting the oldest once the window is full.
    /// Returns the evicted root, if any.
    pub fn push(&mut self, root: Field) -> Option<Field> {
        let next = (self.cursor + 1) % self.slots.len();
        let evicted = if self.filled == self.slots.len() {
            let old = self.slots[next];
            self.forget(old);
            Some(old)
        } else {
            self.filled += 1;
            None
        };
        self.slots[next] = root;
        *self.counts.entry(root).or_insert(0) += 1;
        self.cursor = next;
        evicted
    }

    fn forget(&mut self, root: Field) {
        if let Some(count) = self.counts.get_mut(&root) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&root);
            }
        }
    }

    pub fn current(&self) -> Field {
        self.slots[self.cursor]
    }

    /// The zero root is never considered known.
    pub fn contains(&self, root: &Field) -> bool {
        !root.is_zero() && self.counts.contains_key(root)
    }

    /// Roots in the window, newest first.
    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        let cap = self.slots.len();
        (0..self.filled).map(move |age| self.slots[(self.cursor + cap - age) % cap])
    }
}

// =============================================================================
//                          MERKLE PROOFS
// =============================================================================

/// A single step in a Merkle proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofStep {
    /// true if the current node is the LEFT child (index even at this level).
    /// When is_left=true:  parent = H(current, sibling)
    /// When is_left=false: parent = H(sibling, current)
    pub is_left: bool,
    /// The sibling hash at this level.
    pub sibling: Field,
}

/// Verify a Merkle proof against an expected root.
pub fn verify_merkle_proof<H: HashPrimitive>(
    hasher: &H,
    leaf: Field,
    proof: &[MerkleProofStep],
    expected_root: Field,
) -> bool {
    let mut current = leaf;
    for step in proof {
        current = if step.is_left {
            hasher.hash_pair(current, step.sibling)
        } else {
            hasher.hash_pair(step.sibling, current)
        };
    }
    current == expected_root
}

// =============================================================================
//                          COMMITMENT TREE
// =============================================================================

/// Append-only incremental Merkle tree of fixed depth.
///
/// Insertion touches one node per level: the left neighbours are cached in
/// `filled_subtrees` and the right neighbours of a fresh leaf are always
/// empty subtrees (`zeros`). Every insertion records the new root in the
/// [`RootHistory`].
#[derive(Clone, Debug)]
pub struct CommitmentTree<H> {
    hasher: H,
    levels: usize,
    zeros: Vec<Field>,
    filled_subtrees: Vec<Field>,
    next_index: u64,
    history: RootHistory,
    /// All inserted leaves in order
    leaves: Vec<Field>,
}

impl<H: HashPrimitive> CommitmentTree<H> {
    /// Create an empty tree. The empty root is the first history entry.
    pub fn new(hasher: H, levels: usize, history_size: usize) -> Result<Self, PoolError> {
        if levels == 0 || levels > MAX_TREE_LEVELS {
            return Err(PoolError::InvalidConfig(format!(
                "tree levels must be in 1..={MAX_TREE_LEVELS}, got {levels}"
            )));
        }
        let zeros = compute_zeros(&hasher, levels);
        let filled_subtrees = zeros[..levels].to_vec();
        let history = RootHistory::new(history_size, zeros[levels])?;
        Ok(Self {
            hasher,
            levels,
            zeros,
            filled_subtrees,
            next_index: 0,
            history,
            leaves: Vec::new(),
        })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.levels
    }

    pub fn leaf_count(&self) -> u64 {
        self.next_index
    }

    pub fn is_full(&self) -> bool {
        self.next_index >= self.capacity()
    }

    pub fn leaves(&self) -> &[Field] {
        &self.leaves
    }

    pub fn history(&self) -> &RootHistory {
        &self.history
    }

    /// Fails with `TreeFull` if another leaf would not fit.
    pub fn check_capacity(&self) -> Result<(), PoolError> {
        if self.is_full() {
            return Err(PoolError::TreeFull { capacity: self.capacity() });
        }
        Ok(())
    }

    /// Insert a leaf. Returns the leaf index and the new root.
    pub fn insert(&mut self, leaf: Field) -> Result<(u64, Field), PoolError> {
        self.check_capacity()?;
        let index = self.next_index;

        let mut current_index = index;
        let mut current_hash = leaf;
        for level in 0..self.levels {
            if current_index % 2 == 0 {
                // Left child: pair with the empty subtree on the right
                self.filled_subtrees[level] = current_hash;
                current_hash = self.hasher.hash_pair(current_hash, self.zeros[level]);
            } else {
                // Right child: pair with the filled subtree on the left
                current_hash = self.hasher.hash_pair(self.filled_subtrees[level], current_hash);
            }
            current_index /= 2;
        }

        self.history.push(current_hash);
        self.next_index = index + 1;
        self.leaves.push(leaf);
        Ok((index, current_hash))
    }

    /// Get the most recent root.
    pub fn root(&self) -> Field {
        self.history.current()
    }

    /// Whether `root` is inside the retained history window.
    pub fn is_known_root(&self, root: &Field) -> bool {
        self.history.contains(root)
    }

    /// Generate a Merkle proof for the leaf at `leaf_index` against the
    /// current root.
    ///
    /// Only the populated part of each level is materialized; everything to
    /// the right of it is an empty subtree.
    pub fn proof(&self, leaf_index: u64) -> Option<Vec<MerkleProofStep>> {
        if leaf_index >= self.next_index {
            return None;
        }
        let mut level_nodes = self.leaves.clone();
        let mut idx = leaf_index as usize;
        let mut proof = Vec::with_capacity(self.levels);

        for level in 0..self.levels {
            let sibling_idx = idx ^ 1;
            let sibling = level_nodes.get(sibling_idx).copied().unwrap_or(self.zeros[level]);
            proof.push(MerkleProofStep { is_left: idx % 2 == 0, sibling });

            level_nodes = level_nodes
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(self.zeros[level]);
                    self.hasher.hash_pair(pair[0], right)
                })
                .collect();
            idx /= 2;
        }

        Some(proof)
    }
}
