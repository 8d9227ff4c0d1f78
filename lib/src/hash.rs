//! Hash capability used by the commitment tree, key derivation and nullifiers.
//!
//! The production circuit hashes with Poseidon over BN254; this crate never
//! hard-codes it. Any backend implementing [`HashPrimitive`] can be injected,
//! as long as the prover side uses the same one.

use crate::field::Field;
use tiny_keccak::{Hasher, Keccak};

// =============================================================================
//                          KECCAK256 HELPERS
// =============================================================================

/// Compute keccak256 hash. This matches Solidity's keccak256() opcode.
/// Note: tiny_keccak::Keccak is the original Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

// =============================================================================
//                          HASH CAPABILITY
// =============================================================================

/// A fixed-arity hash over field elements.
///
/// Implementations must be deterministic and must support arities 1, 2 and 3
/// (the Poseidon T2/T3/T4 instances). Tree nodes use arity 2.
pub trait HashPrimitive {
    fn hash(&self, inputs: &[Field]) -> Field;

    fn hash_pair(&self, left: Field, right: Field) -> Field {
        self.hash(&[left, right])
    }
}

impl<H: HashPrimitive + ?Sized> HashPrimitive for &H {
    fn hash(&self, inputs: &[Field]) -> Field {
        (**self).hash(inputs)
    }
}

impl<H: HashPrimitive + ?Sized> HashPrimitive for Box<H> {
    fn hash(&self, inputs: &[Field]) -> Field {
        (**self).hash(inputs)
    }
}

/// Reference backend: keccak256 over the concatenated 32-byte big-endian
/// encodings of the inputs, reduced into the field.
///
///   H(x_1, .., x_n) = keccak256(be32(x_1) || .. || be32(x_n)) mod p
///
/// Used by the CLI and tests when no Poseidon backend is wired in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeccakHasher;

impl HashPrimitive for KeccakHasher {
    fn hash(&self, inputs: &[Field]) -> Field {
        let mut hasher = Keccak::v256();
        for input in inputs {
            hasher.update(&input.to_be_bytes());
        }
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        Field::from_be_bytes(output)
    }
}
