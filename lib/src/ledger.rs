use crate::error::PoolError;
use crate::field::Field;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What the pool remembers about one deposit key. Written once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    pub depositor: Address,
    pub asset: Address,
    /// Amount credited after the protocol fee.
    pub amount_after_deposit: U256,
}

/// Read-only view of a key's deposit together with the depositor's running
/// count of unique deposits in that asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositDelta {
    pub info: DepositInfo,
    pub unique_deposits: u64,
    pub current_deposit: U256,
}

/// Deposit records keyed by standardized deposit key.
#[derive(Clone, Debug, Default)]
pub struct DepositLedger {
    deposits: HashMap<Field, DepositInfo>,
    unique_deposits: HashMap<(Address, Address), u64>,
}

impl DepositLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &Field) -> bool {
        self.deposits.contains_key(key)
    }

    pub fn ensure_unused(&self, key: &Field) -> Result<(), PoolError> {
        if self.contains(key) {
            return Err(PoolError::KeyAlreadyUsed(*key));
        }
        Ok(())
    }

    /// Record a first deposit under `key`. A key can be recorded only once.
    pub fn record_deposit(
        &mut self,
        key: Field,
        depositor: Address,
        asset: Address,
        net_amount: U256,
    ) -> Result<DepositDelta, PoolError> {
        self.ensure_unused(&key)?;
        self.deposits.insert(
            key,
            DepositInfo { depositor, asset, amount_after_deposit: net_amount },
        );
        *self.unique_deposits.entry((depositor, asset)).or_insert(0) += 1;
        Ok(self.deposit_delta(&key))
    }

    /// Zero-valued for an unseen key.
    pub fn deposit_delta(&self, key: &Field) -> DepositDelta {
        match self.deposits.get(key) {
            Some(info) => DepositDelta {
                info: *info,
                unique_deposits: self.unique_deposits(info.depositor, info.asset),
                current_deposit: info.amount_after_deposit,
            },
            None => DepositDelta::default(),
        }
    }

    pub fn unique_deposits(&self, user: Address, asset: Address) -> u64 {
        self.unique_deposits.get(&(user, asset)).copied().unwrap_or(0)
    }

    pub fn user_has_deposited(&self, user: Address, asset: Address) -> bool {
        self.unique_deposits(user, asset) != 0
    }

    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }
}
