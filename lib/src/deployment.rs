//! Deployment records written when a pool is initialized.
//!
//! `deployments.json` maps a chain id to the addresses of the pool and its
//! auxiliary tokens:
//!
//! ```json
//! { "31337": { "addressAndTokens": { "address": "0x..", "usdc": "0x.." } } }
//! ```
//!
//! `interface.json` describes the pool's public operations and errors. It is
//! written only when no file exists yet.

use crate::error::{PersistError, PoolError};
use crate::hash::keccak256;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Key under which the pool's own address is stored.
pub const CORE_ADDRESS_KEY: &str = "address";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEntry {
    #[serde(rename = "addressAndTokens")]
    pub address_and_tokens: BTreeMap<String, Address>,
}

impl DeploymentEntry {
    pub fn core(&self) -> Option<Address> {
        self.address_and_tokens.get(CORE_ADDRESS_KEY).copied()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentBook(BTreeMap<String, DeploymentEntry>);

impl DeploymentBook {
    /// Read the book at `path`, or start an empty one if there is no file.
    pub fn load_or_default(path: &Path) -> Result<Self, PersistError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| PersistError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Replace the entry for `chain_id`. Entries of other chains are kept.
    pub fn upsert<'a>(
        &mut self,
        chain_id: u64,
        core: Address,
        tokens: impl IntoIterator<Item = (&'a str, Address)>,
    ) -> &DeploymentEntry {
        let mut address_and_tokens: BTreeMap<String, Address> =
            tokens.into_iter().map(|(symbol, addr)| (symbol.to_lowercase(), addr)).collect();
        address_and_tokens.insert(CORE_ADDRESS_KEY.to_string(), core);
        let entry = self.0.entry(chain_id.to_string()).or_default();
        entry.address_and_tokens = address_and_tokens;
        entry
    }

    pub fn get(&self, chain_id: u64) -> Option<&DeploymentEntry> {
        self.0.get(&chain_id.to_string())
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        write_json(path, self)
    }
}

/// Deterministic address for a labelled deployment by `deployer`: the last
/// 20 bytes of `keccak256(deployer ++ label)`.
pub fn derive_address(deployer: Address, label: &str) -> Address {
    let mut preimage = Vec::with_capacity(20 + label.len());
    preimage.extend_from_slice(deployer.as_slice());
    preimage.extend_from_slice(label.as_bytes());
    Address::from_slice(&keccak256(&preimage)[12..])
}

// =============================================================================
//                          INTERFACE DESCRIPTION
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescription {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub errors: Vec<String>,
    pub read_only: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescription {
    pub operations: Vec<OperationDescription>,
    pub errors: Vec<String>,
}

fn op(name: &str, inputs: &[&str], outputs: &[&str], errors: &[&str], read_only: bool) -> OperationDescription {
    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    OperationDescription {
        name: name.to_string(),
        inputs: owned(inputs),
        outputs: owned(outputs),
        errors: owned(errors),
        read_only,
    }
}

/// The pool's public surface.
pub fn pool_interface() -> InterfaceDescription {
    InterfaceDescription {
        operations: vec![
            op(
                "deposit",
                &["keyHash", "asset", "amount", "attachedValue"],
                &["leaf", "newRoot"],
                &["KeyAlreadyUsed", "ETHSentLessThanDeposit", "TreeFull", "AmountOutOfRange", "TransferFailed"],
                false,
            ),
            op(
                "withdraw",
                &["root", "withdrawalKey", "proof", "nullifier", "recipient", "amount"],
                &[],
                &["RootNotInHistory", "NullifierUsed", "WithdrawalExceedsMax", "ProofNotVerified", "TransferFailed"],
                false,
            ),
            op("root", &[], &["root"], &[], true),
            op("getDepositDelta", &["key"], &["depositDelta"], &[], true),
            op("userHasDeposited", &["user", "asset"], &["bool"], &[], true),
            op("getMaxWithdrawalOnAmount", &["amount"], &["max"], &[], true),
            op("getPublicSignals", &["root", "withdrawalKey", "nullifier", "recipient", "amount"], &["signals"], &["AmountOutOfRange"], true),
            op("isSpent", &["nullifier"], &["bool"], &[], true),
            op("isKnownRoot", &["root"], &["bool"], &[], true),
        ],
        errors: PoolError::operation_errors().iter().map(|e| e.name().to_string()).collect(),
    }
}

impl InterfaceDescription {
    /// Returns `true` if the file was written, `false` if one already existed.
    pub fn write_if_absent(&self, path: &Path) -> Result<bool, PersistError> {
        if path.exists() {
            info!(path = %path.display(), "interface description exists, leaving it");
            return Ok(false);
        }
        write_json(path, self)?;
        Ok(true)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PersistError::Json {
        path: path.display().to_string(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })
}
