//! Proof gate capability and public-signal assembly.
//!
//! Public signals (5 field elements, 160 bytes when packed):
//!   [root, withdrawalKey, nullifierHash, recipient, amount]
//! Each slot is the canonical 32-byte big-endian encoding of a BN254 scalar:
//!   - withdrawalKey is the standardized withdrawal key H(keyHash, asset, amount)
//!   - recipient is the 20-byte address left-padded with zeros
//!   - amount must be below the field modulus
//! The prover must commit to exactly this order and encoding.

use crate::error::PoolError;
use crate::field::Field;
use crate::hash::keccak256;
use crate::keys::amount_to_field;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

pub const PUBLIC_SIGNAL_COUNT: usize = 5;

/// Groth16 proof points as the verifier contract takes them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    #[serde(rename = "pA")]
    pub a: [U256; 2],
    #[serde(rename = "pB")]
    pub b: [[U256; 2]; 2],
    #[serde(rename = "pC")]
    pub c: [U256; 2],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicSignals([Field; PUBLIC_SIGNAL_COUNT]);

impl PublicSignals {
    /// Assemble the signals for a withdrawal. `withdrawal_key` is already
    /// standardized and `nullifier_hash` already hashed.
    pub fn assemble(
        root: Field,
        withdrawal_key: Field,
        nullifier_hash: Field,
        recipient: Address,
        amount: U256,
    ) -> Result<Self, PoolError> {
        Ok(Self([
            root,
            withdrawal_key,
            nullifier_hash,
            Field::from_address(recipient),
            amount_to_field(amount)?,
        ]))
    }

    pub fn as_slice(&self) -> &[Field] {
        &self.0
    }

    pub fn root(&self) -> Field {
        self.0[0]
    }

    pub fn nullifier_hash(&self) -> Field {
        self.0[2]
    }

    /// Packed 160-byte form: five contiguous 32-byte slots, no length prefix.
    pub fn to_be_bytes(&self) -> [u8; 32 * PUBLIC_SIGNAL_COUNT] {
        let mut out = [0u8; 32 * PUBLIC_SIGNAL_COUNT];
        for (slot, signal) in out.chunks_exact_mut(32).zip(self.0.iter()) {
            slot.copy_from_slice(&signal.to_be_bytes());
        }
        out
    }

    pub fn digest(&self) -> [u8; 32] {
        keccak256(&self.to_be_bytes())
    }
}

/// Accepts or rejects a proof against a public-signal vector.
pub trait ProofGate {
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> bool;
}

impl<G: ProofGate + ?Sized> ProofGate for &G {
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> bool {
        (**self).verify(proof, signals)
    }
}

impl<G: ProofGate + ?Sized> ProofGate for Box<G> {
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> bool {
        (**self).verify(proof, signals)
    }
}

/// Development backend: a "proof" is valid iff `pA[0]` equals the keccak
/// digest of the packed public signals and every other point is zero.
///
/// It binds a proof to its exact signals, which is enough to exercise the
/// withdrawal path end to end. It proves nothing about the secret.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalDigestGate;

impl SignalDigestGate {
    pub fn prove(signals: &PublicSignals) -> Groth16Proof {
        Groth16Proof {
            a: [U256::from_be_bytes(signals.digest()), U256::ZERO],
            ..Groth16Proof::default()
        }
    }
}

impl ProofGate for SignalDigestGate {
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> bool {
        *proof == Self::prove(signals)
    }
}
