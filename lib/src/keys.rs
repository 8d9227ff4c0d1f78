//! Deposit and withdrawal keys.
//!
//! Both keys carry the same metadata in their raw form:
//!
//!   raw = keyHash (32 bytes) || asset (20 bytes) || amount (32 bytes, BE)
//!
//! 84 bytes in total. Only the key hashes differ:
//!
//!   secret        = keccak256(secretBytes) mod p
//!   depositHash   = H(secret, asset, amount)
//!   withdrawHash  = H(H(secret), asset, amount)
//!
//! The standardized form of either key is `H(keyHash, asset, amount)`; for a
//! deposit key this is the tree leaf and the ledger key.

use crate::error::PoolError;
use crate::field::Field;
use crate::hash::{keccak256, HashPrimitive};
use alloy_primitives::{Address, U256};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Length of a raw key in bytes.
pub const RAW_KEY_LEN: usize = 84;

/// Map arbitrary secret bytes into the field.
pub fn secret_to_field(secret: &[u8]) -> Field {
    Field::from_be_bytes(keccak256(secret))
}

/// Amounts are hashed as field elements, so they must be canonical.
pub fn amount_to_field(amount: U256) -> Result<Field, PoolError> {
    Field::try_from(amount).map_err(|_| PoolError::AmountOutOfRange(amount))
}

/// Standardized (hash-domain) form of a key: `H(keyHash, asset, amount)`.
pub fn standardize<H: HashPrimitive>(
    hasher: &H,
    key_hash: Field,
    asset: Address,
    amount: U256,
) -> Result<Field, PoolError> {
    Ok(hasher.hash(&[key_hash, Field::from_address(asset), amount_to_field(amount)?]))
}

macro_rules! raw_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub key_hash: Field,
            pub asset: Address,
            pub amount: U256,
        }

        impl $name {
            pub fn to_bytes(&self) -> [u8; RAW_KEY_LEN] {
                let mut out = [0u8; RAW_KEY_LEN];
                out[0..32].copy_from_slice(&self.key_hash.to_be_bytes());
                out[32..52].copy_from_slice(self.asset.as_slice());
                out[52..84].copy_from_slice(&self.amount.to_be_bytes::<32>());
                out
            }

            /// Split a raw key back into its metadata. The key hash must be
            /// a canonical field element.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, PoolError> {
                if bytes.len() != RAW_KEY_LEN {
                    return Err(PoolError::InvalidKey(format!(
                        "expected {RAW_KEY_LEN} bytes, got {}",
                        bytes.len()
                    )));
                }
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes[0..32]);
                let key_hash = Field::try_from(U256::from_be_bytes(hash))
                    .map_err(|e| PoolError::InvalidKey(e.to_string()))?;
                Ok(Self {
                    key_hash,
                    asset: Address::from_slice(&bytes[32..52]),
                    amount: U256::from_be_slice(&bytes[52..84]),
                })
            }

            pub fn standardize<H: HashPrimitive>(&self, hasher: &H) -> Result<Field, PoolError> {
                standardize(hasher, self.key_hash, self.asset, self.amount)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.to_bytes()))
            }
        }

        impl FromStr for $name {
            type Err = PoolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| PoolError::InvalidKey(e.to_string()))?;
                Self::from_bytes(&bytes)
            }
        }
    };
}

raw_key!(
    /// Binds a deposit to `(asset, amount, secret)`. Handed to the pool at
    /// deposit time.
    DepositKey
);

raw_key!(
    /// Presented at withdrawal time. Derived from the same triple as the
    /// deposit key but not linkable to it without the secret.
    WithdrawalKey
);

/// Derive both keys for a deposit of `amount` of `asset` under `secret`.
pub fn generate_keys<H: HashPrimitive>(
    hasher: &H,
    asset: Address,
    amount: U256,
    secret: &[u8],
) -> Result<(DepositKey, WithdrawalKey), PoolError> {
    let amount_field = amount_to_field(amount)?;
    let asset_field = Field::from_address(asset);
    let secret = secret_to_field(secret);

    let deposit_hash = hasher.hash(&[secret, asset_field, amount_field]);
    let withdrawal_hash = hasher.hash(&[hasher.hash(&[secret]), asset_field, amount_field]);

    Ok((
        DepositKey { key_hash: deposit_hash, asset, amount },
        WithdrawalKey { key_hash: withdrawal_hash, asset, amount },
    ))
}
