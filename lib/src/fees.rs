use crate::error::PoolError;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HUNDRED: U256 = U256::from_limbs([100, 0, 0, 0]);

/// `floor(amount * percent / 100)` without overflowing for any `amount`.
pub fn percent_of(amount: U256, percent: u8) -> U256 {
    let p = U256::from(percent);
    (amount / HUNDRED) * p + (amount % HUNDRED) * p / HUNDRED
}

/// Fee and withdrawal-cap parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicy {
    /// Protocol fee, percent of the deposited amount.
    pub fee_rate_percent: u8,
    /// Share of every fee paid to the primary collector; the rest goes to
    /// the secondary collector.
    pub primary_collector_percent: u8,
    /// Maximum withdrawal as a percent of the net deposited amount.
    pub withdrawal_cap_percent: u8,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self { fee_rate_percent: 1, primary_collector_percent: 90, withdrawal_cap_percent: 100 }
    }
}

impl FeePolicy {
    pub fn validate(&self) -> Result<(), PoolError> {
        for (name, value) in [
            ("fee_rate_percent", self.fee_rate_percent),
            ("primary_collector_percent", self.primary_collector_percent),
            ("withdrawal_cap_percent", self.withdrawal_cap_percent),
        ] {
            if value > 100 {
                return Err(PoolError::InvalidConfig(format!("{name} must be <= 100, got {value}")));
            }
        }
        Ok(())
    }

    pub fn compute_fee(&self, amount: U256) -> U256 {
        percent_of(amount, self.fee_rate_percent)
    }

    pub fn net_amount(&self, amount: U256) -> U256 {
        amount - self.compute_fee(amount)
    }

    /// Remainder goes to the secondary collector so the shares always sum
    /// to `fee`.
    pub fn split_fee(&self, fee: U256) -> FeeSplit {
        let primary = percent_of(fee, self.primary_collector_percent);
        FeeSplit { primary, secondary: fee - primary }
    }

    /// Largest amount a single withdrawal may take from a deposit of
    /// `amount`. Depends on the amount only, never on ledger state.
    pub fn max_withdrawal_on_amount(&self, amount: U256) -> U256 {
        percent_of(self.net_amount(amount), self.withdrawal_cap_percent)
    }
}

/// The two fee recipients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCollectors {
    pub primary: Address,
    pub secondary: Address,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub primary: U256,
    pub secondary: U256,
}

impl FeeSplit {
    pub fn total(&self) -> U256 {
        self.primary + self.secondary
    }
}

/// Fees collected so far, per asset. The native asset is its own stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeeLedger {
    collected: BTreeMap<Address, FeeSplit>,
}

impl FeeLedger {
    pub fn record(&mut self, asset: Address, split: FeeSplit) {
        let entry = self.collected.entry(asset).or_default();
        entry.primary += split.primary;
        entry.secondary += split.secondary;
    }

    pub fn collected(&self, asset: Address) -> FeeSplit {
        self.collected.get(&asset).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &FeeSplit)> {
        self.collected.iter()
    }
}
