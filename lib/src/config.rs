use crate::error::PoolError;
use crate::fees::{FeeCollectors, FeePolicy};
use crate::field::Field;
use crate::tree::MAX_TREE_LEVELS;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TREE_LEVELS: usize = 20;
/// Matches the root window of the deployed contracts.
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;

pub const DEFAULT_PRIMARY_COLLECTOR: Address = Address::repeat_byte(0xc1);
pub const DEFAULT_SECONDARY_COLLECTOR: Address = Address::repeat_byte(0xc2);

/// Fixed parameters of a pool, set once at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    pub tree_levels: usize,
    pub root_history_size: usize,
    pub fee_rate_percent: u8,
    pub primary_collector_percent: u8,
    pub withdrawal_cap_percent: u8,
    pub primary_collector: Address,
    pub secondary_collector: Address,
    /// Leaf inserted at construction, before any deposit.
    pub init_leaf: Option<Field>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let policy = FeePolicy::default();
        Self {
            tree_levels: DEFAULT_TREE_LEVELS,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            fee_rate_percent: policy.fee_rate_percent,
            primary_collector_percent: policy.primary_collector_percent,
            withdrawal_cap_percent: policy.withdrawal_cap_percent,
            primary_collector: DEFAULT_PRIMARY_COLLECTOR,
            secondary_collector: DEFAULT_SECONDARY_COLLECTOR,
            init_leaf: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.tree_levels == 0 || self.tree_levels > MAX_TREE_LEVELS {
            return Err(PoolError::InvalidConfig(format!(
                "tree_levels must be in 1..={MAX_TREE_LEVELS}, got {}",
                self.tree_levels
            )));
        }
        if self.root_history_size == 0 {
            return Err(PoolError::InvalidConfig("root_history_size must be positive".into()));
        }
        if self.primary_collector == Address::ZERO || self.secondary_collector == Address::ZERO {
            return Err(PoolError::InvalidConfig("fee collectors must be set".into()));
        }
        self.policy().validate()
    }

    pub fn policy(&self) -> FeePolicy {
        FeePolicy {
            fee_rate_percent: self.fee_rate_percent,
            primary_collector_percent: self.primary_collector_percent,
            withdrawal_cap_percent: self.withdrawal_cap_percent,
        }
    }

    pub fn collectors(&self) -> FeeCollectors {
        FeeCollectors { primary: self.primary_collector, secondary: self.secondary_collector }
    }
}
