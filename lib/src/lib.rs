//! Accounting core of a privacy pool.
//!
//! Deposits are committed as leaves of an append-only Merkle tree. A later
//! withdrawal proves, against one of the recent roots, that it knows the key
//! behind some leaf without revealing which one, and burns a nullifier so the
//! same deposit cannot be drained twice.
//!
//! Hashing ([`HashPrimitive`]), proof checking ([`ProofGate`]) and value
//! movement ([`FundsGateway`]) are injected.

pub mod config;
pub mod deployment;
pub mod error;
pub mod fees;
pub mod field;
pub mod gateway;
pub mod hash;
pub mod keys;
pub mod ledger;
pub mod nullifier;
pub mod pool;
pub mod proof;
pub mod tree;

pub use config::PoolConfig;
pub use error::{PersistError, PoolError};
pub use fees::{FeeCollectors, FeeLedger, FeePolicy, FeeSplit};
pub use field::{Field, FieldParseError, MODULUS};
pub use gateway::{FundsGateway, GatewayError, InMemoryGateway, Settlement, NATIVE_ASSET};
pub use hash::{keccak256, HashPrimitive, KeccakHasher};
pub use keys::{generate_keys, standardize, DepositKey, WithdrawalKey};
pub use ledger::{DepositDelta, DepositInfo, DepositLedger};
pub use nullifier::{compute_nullifier_hash, NullifierRegistry};
pub use pool::{
    DepositReceipt, DepositRequest, Pool, WithdrawReceipt, WithdrawRequest, WithdrawalStage,
};
pub use proof::{Groth16Proof, ProofGate, PublicSignals, SignalDigestGate};
pub use tree::{verify_merkle_proof, CommitmentTree, MerkleProofStep, RootHistory};
