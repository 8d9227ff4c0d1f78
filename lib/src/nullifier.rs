use crate::error::PoolError;
use crate::field::Field;
use crate::hash::HashPrimitive;
use std::collections::HashSet;

/// Public nullifier hash: `H(nullifier)`. This is what the proof commits to
/// and what the registry records.
pub fn compute_nullifier_hash<H: HashPrimitive>(hasher: &H, nullifier: Field) -> Field {
    hasher.hash(&[nullifier])
}

/// Set of spent nullifier hashes. Grows monotonically.
#[derive(Clone, Debug, Default)]
pub struct NullifierRegistry {
    spent: HashSet<Field>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spent(&self, nullifier_hash: &Field) -> bool {
        self.spent.contains(nullifier_hash)
    }

    /// Check without consuming.
    pub fn ensure_unspent(&self, nullifier_hash: &Field) -> Result<(), PoolError> {
        if self.is_spent(nullifier_hash) {
            return Err(PoolError::NullifierUsed(*nullifier_hash));
        }
        Ok(())
    }

    /// Mark a nullifier hash as spent.
    pub fn consume(&mut self, nullifier_hash: Field) -> Result<(), PoolError> {
        if !self.spent.insert(nullifier_hash) {
            return Err(PoolError::NullifierUsed(nullifier_hash));
        }
        Ok(())
    }

    /// Undo a `consume` whose enclosing withdrawal aborted during settlement.
    pub(crate) fn revert(&mut self, nullifier_hash: &Field) {
        self.spent.remove(nullifier_hash);
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}
