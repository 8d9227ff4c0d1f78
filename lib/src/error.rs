use crate::field::Field;
use crate::gateway::GatewayError;
use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Every way a pool operation can be rejected.
///
/// A returned error always means the operation had no effect on ledger
/// state. Nothing is retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("KeyAlreadyUsed: deposit key {0} already has a deposit")]
    KeyAlreadyUsed(Field),

    #[error("ETHSentLessThanDeposit: attached {sent}, deposit requires {required}")]
    EthSentLessThanDeposit { sent: U256, required: U256 },

    #[error("TreeFull: commitment tree holds {capacity} leaves")]
    TreeFull { capacity: u64 },

    #[error("RootNotInHistory: {0} is not a recent root")]
    RootNotInHistory(Field),

    #[error("WithdrawalExceedsMax: requested {requested}, max {max}")]
    WithdrawalExceedsMax { requested: U256, max: U256 },

    #[error("ProofNotVerified")]
    ProofNotVerified,

    #[error("NullifierUsed: nullifier hash {0} already spent")]
    NullifierUsed(Field),

    /// Amounts are committed to as field elements and must fit in one.
    #[error("AmountOutOfRange: {0} does not fit in the hash field")]
    AmountOutOfRange(U256),

    #[error("InvalidKey: {0}")]
    InvalidKey(String),

    #[error("TransferFailed: {0}")]
    Transfer(#[from] GatewayError),

    #[error("InvalidConfig: {0}")]
    InvalidConfig(String),
}

impl PoolError {
    /// Stable condition name as exposed in the interface description.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::KeyAlreadyUsed(_) => "KeyAlreadyUsed",
            Self::EthSentLessThanDeposit { .. } => "ETHSentLessThanDeposit",
            Self::TreeFull { .. } => "TreeFull",
            Self::RootNotInHistory(_) => "RootNotInHistory",
            Self::WithdrawalExceedsMax { .. } => "WithdrawalExceedsMax",
            Self::ProofNotVerified => "ProofNotVerified",
            Self::NullifierUsed(_) => "NullifierUsed",
            Self::AmountOutOfRange(_) => "AmountOutOfRange",
            Self::InvalidKey(_) => "InvalidKey",
            Self::Transfer(_) => "TransferFailed",
            Self::InvalidConfig(_) => "InvalidConfig",
        }
    }

    /// One value of every condition a pool operation can report to its
    /// caller, in interface order. Configuration and key-parsing errors are
    /// local to construction and tooling and are left out.
    pub fn operation_errors() -> [PoolError; 9] {
        [
            Self::KeyAlreadyUsed(Field::ZERO),
            Self::EthSentLessThanDeposit { sent: U256::ZERO, required: U256::ZERO },
            Self::TreeFull { capacity: 0 },
            Self::RootNotInHistory(Field::ZERO),
            Self::WithdrawalExceedsMax { requested: U256::ZERO, max: U256::ZERO },
            Self::ProofNotVerified,
            Self::NullifierUsed(Field::ZERO),
            Self::AmountOutOfRange(U256::ZERO),
            Self::Transfer(GatewayError::Rejected { asset: Address::ZERO, to: Address::ZERO }),
        ]
    }
}

/// Failure reading or writing the deployment records.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
