//! Value movement in and out of the pool.
//!
//! The pool never touches balances itself. It describes the transfers an
//! operation needs as a [`Settlement`] and hands it to a [`FundsGateway`].
//! The zero address stands for the native asset.

use alloy_primitives::{Address, U256};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{error, warn};

/// Sentinel asset address for the native asset.
pub const NATIVE_ASSET: Address = Address::ZERO;

pub fn is_native(asset: Address) -> bool {
    asset == NATIVE_ASSET
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{holder} holds {available} of {asset}, needs {required}")]
    InsufficientBalance { asset: Address, holder: Address, available: U256, required: U256 },

    #[error("transfer of {asset} to {to} rejected")]
    Rejected { asset: Address, to: Address },
}

/// Moves value for one asset at a time.
pub trait FundsGateway {
    /// Move `amount` of `asset` from `from` into pool custody.
    fn pull(&mut self, asset: Address, from: Address, amount: U256) -> Result<(), GatewayError>;

    /// Move `amount` of `asset` from pool custody to `to`.
    fn push(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), GatewayError>;
}

impl<G: FundsGateway + ?Sized> FundsGateway for &mut G {
    fn pull(&mut self, asset: Address, from: Address, amount: U256) -> Result<(), GatewayError> {
        (**self).pull(asset, from, amount)
    }

    fn push(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), GatewayError> {
        (**self).push(asset, to, amount)
    }
}

// =============================================================================
//                              SETTLEMENT
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Pull { asset: Address, from: Address, amount: U256 },
    Push { asset: Address, to: Address, amount: U256 },
}

impl Leg {
    fn apply<G: FundsGateway + ?Sized>(&self, gateway: &mut G) -> Result<(), GatewayError> {
        match *self {
            Self::Pull { asset, from, amount } => gateway.pull(asset, from, amount),
            Self::Push { asset, to, amount } => gateway.push(asset, to, amount),
        }
    }

    fn inverse(&self) -> Self {
        match *self {
            Self::Pull { asset, from, amount } => Self::Push { asset, to: from, amount },
            Self::Push { asset, to, amount } => Self::Pull { asset, from: to, amount },
        }
    }
}

/// Ordered list of transfers that either all happen or none do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    legs: Vec<Leg>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-amount legs are dropped.
    pub fn pull(mut self, asset: Address, from: Address, amount: U256) -> Self {
        if !amount.is_zero() {
            self.legs.push(Leg::Pull { asset, from, amount });
        }
        self
    }

    pub fn push(mut self, asset: Address, to: Address, amount: U256) -> Self {
        if !amount.is_zero() {
            self.legs.push(Leg::Push { asset, to, amount });
        }
        self
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Apply every leg in order. If one fails, the legs already applied are
    /// undone in reverse order and the original error is returned.
    pub fn execute<G: FundsGateway + ?Sized>(&self, gateway: &mut G) -> Result<(), GatewayError> {
        for (i, leg) in self.legs.iter().enumerate() {
            if let Err(err) = leg.apply(gateway) {
                warn!(leg = i, %err, "settlement leg failed, unwinding");
                for done in self.legs[..i].iter().rev() {
                    if let Err(undo) = done.inverse().apply(gateway) {
                        error!(?done, %undo, "failed to unwind settlement leg");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

// =============================================================================
//                          IN-MEMORY GATEWAY
// =============================================================================

/// Balance book for simulations and tests. The pool's own holdings live under
/// the `custody` address.
#[derive(Clone, Debug)]
pub struct InMemoryGateway {
    custody: Address,
    balances: HashMap<(Address, Address), U256>,
    rejecting: HashSet<Address>,
}

impl InMemoryGateway {
    pub fn new(custody: Address) -> Self {
        Self { custody, balances: HashMap::new(), rejecting: HashSet::new() }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn mint(&mut self, asset: Address, to: Address, amount: U256) {
        *self.balances.entry((asset, to)).or_insert(U256::ZERO) += amount;
    }

    pub fn balance_of(&self, asset: Address, holder: Address) -> U256 {
        self.balances.get(&(asset, holder)).copied().unwrap_or(U256::ZERO)
    }

    /// Make every transfer to `to` fail, like a recipient contract that
    /// reverts on receive.
    pub fn reject_transfers_to(&mut self, to: Address) {
        self.rejecting.insert(to);
    }

    fn transfer(&mut self, asset: Address, from: Address, to: Address, amount: U256) -> Result<(), GatewayError> {
        if self.rejecting.contains(&to) {
            return Err(GatewayError::Rejected { asset, to });
        }
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(GatewayError::InsufficientBalance {
                asset,
                holder: from,
                available,
                required: amount,
            });
        }
        self.balances.insert((asset, from), available - amount);
        self.mint(asset, to, amount);
        Ok(())
    }
}

impl FundsGateway for InMemoryGateway {
    fn pull(&mut self, asset: Address, from: Address, amount: U256) -> Result<(), GatewayError> {
        let custody = self.custody;
        self.transfer(asset, from, custody, amount)
    }

    fn push(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), GatewayError> {
        let custody = self.custody;
        self.transfer(asset, custody, to, amount)
    }
}
