//! The pool: deposit and withdrawal state transitions over one ledger.
//!
//! Every operation validates completely before it mutates anything. Funds
//! move through a [`Settlement`]; when a settlement fails, the pool state is
//! left exactly as it was before the call.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::fees::{FeeCollectors, FeeLedger, FeePolicy, FeeSplit};
use crate::field::Field;
use crate::gateway::{is_native, FundsGateway, Settlement};
use crate::hash::HashPrimitive;
use crate::keys::{standardize, WithdrawalKey};
use crate::ledger::{DepositDelta, DepositLedger};
use crate::nullifier::{compute_nullifier_hash, NullifierRegistry};
use crate::proof::{Groth16Proof, ProofGate, PublicSignals};
use crate::tree::CommitmentTree;
use alloy_primitives::{Address, U256};
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// =============================================================================
//                          REQUESTS / RECEIPTS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub depositor: Address,
    pub key_hash: Field,
    pub asset: Address,
    pub amount: U256,
    /// Native value sent along with the call.
    #[serde(default)]
    pub attached_value: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub leaf: Field,
    pub leaf_index: u64,
    pub new_root: Field,
    pub delta: DepositDelta,
    /// Fee taken on this deposit, in the deposited asset.
    pub fee: FeeSplit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub root: Field,
    pub withdrawal_key: WithdrawalKey,
    pub proof: Groth16Proof,
    pub nullifier: Field,
    pub recipient: Address,
    pub amount: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawReceipt {
    pub nullifier_hash: Field,
    pub asset: Address,
    pub recipient: Address,
    pub amount: U256,
}

/// Checkpoints a withdrawal passes through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalStage {
    Pending,
    RootChecked,
    NullifierChecked,
    AmountChecked,
    ProofChecked,
    Settled,
}

impl fmt::Display for WithdrawalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::RootChecked => "ROOT_CHECKED",
            Self::NullifierChecked => "NULLIFIER_CHECKED",
            Self::AmountChecked => "AMOUNT_CHECKED",
            Self::ProofChecked => "PROOF_CHECKED",
            Self::Settled => "SETTLED",
        };
        f.write_str(name)
    }
}

// =============================================================================
//                                 POOL
// =============================================================================

/// Ledger state plus the injected hash and proof backends.
#[derive(Clone, Debug)]
pub struct Pool<H, V> {
    hasher: H,
    gate: V,
    policy: FeePolicy,
    collectors: FeeCollectors,
    tree: CommitmentTree<H>,
    ledger: DepositLedger,
    nullifiers: NullifierRegistry,
    fees: FeeLedger,
}

impl<H, V> Pool<H, V>
where
    H: HashPrimitive + Clone,
    V: ProofGate,
{
    /// Initialize an empty pool. The configured init leaf, if any, becomes
    /// leaf 0.
    pub fn new(config: &PoolConfig, hasher: H, gate: V) -> Result<Self, PoolError> {
        config.validate()?;
        let mut tree =
            CommitmentTree::new(hasher.clone(), config.tree_levels, config.root_history_size)?;
        if let Some(leaf) = config.init_leaf {
            tree.insert(leaf)?;
        }
        info!(
            levels = config.tree_levels,
            history = config.root_history_size,
            root = %tree.root(),
            "pool initialized"
        );
        Ok(Self {
            hasher,
            gate,
            policy: config.policy(),
            collectors: config.collectors(),
            tree,
            ledger: DepositLedger::new(),
            nullifiers: NullifierRegistry::new(),
            fees: FeeLedger::default(),
        })
    }

    /// Record a deposit and insert its leaf.
    ///
    /// For the native asset the whole attached value is taken (it must cover
    /// `amount`) and the fee is charged on it. For tokens exactly `amount` is
    /// pulled and attached native value is not touched.
    pub fn deposit<G: FundsGateway + ?Sized>(
        &mut self,
        gateway: &mut G,
        request: &DepositRequest,
    ) -> Result<DepositReceipt, PoolError> {
        let DepositRequest { depositor, key_hash, asset, amount, attached_value } = *request;

        let leaf = standardize(&self.hasher, key_hash, asset, amount)?;
        self.ledger.ensure_unused(&leaf)?;
        self.tree.check_capacity()?;

        let gross = if is_native(asset) {
            if attached_value < amount {
                return Err(PoolError::EthSentLessThanDeposit {
                    sent: attached_value,
                    required: amount,
                });
            }
            attached_value
        } else {
            if !attached_value.is_zero() {
                debug!(%attached_value, "attached value ignored for token deposit");
            }
            amount
        };

        let fee = self.policy.split_fee(self.policy.compute_fee(gross));
        let net_amount = self.policy.net_amount(amount);

        Settlement::new()
            .pull(asset, depositor, gross)
            .push(asset, self.collectors.primary, fee.primary)
            .push(asset, self.collectors.secondary, fee.secondary)
            .execute(gateway)
            .map_err(|err| {
                warn!(%leaf, %err, "deposit aborted during settlement");
                PoolError::from(err)
            })?;

        // Both were checked above and cannot fail here.
        let delta = self.ledger.record_deposit(leaf, depositor, asset, net_amount)?;
        let (leaf_index, new_root) = self.tree.insert(leaf)?;
        self.fees.record(asset, fee);

        info!(%leaf, leaf_index, %new_root, %depositor, %asset, %net_amount, "deposit");
        Ok(DepositReceipt { leaf, leaf_index, new_root, delta, fee })
    }

    /// Withdraw `amount` of the withdrawal key's asset to `recipient`.
    ///
    /// Checks run in a fixed order (root, nullifier, amount, proof) and the
    /// nullifier is committed before any value leaves the pool. If the
    /// transfer fails the nullifier is released again.
    pub fn withdraw<G: FundsGateway + ?Sized>(
        &mut self,
        gateway: &mut G,
        request: &WithdrawRequest,
    ) -> Result<WithdrawReceipt, PoolError> {
        let WithdrawRequest { root, withdrawal_key, proof, nullifier, recipient, amount } = *request;
        let asset = withdrawal_key.asset;
        debug!(stage = %WithdrawalStage::Pending, %root, %recipient, %amount);

        if !self.tree.is_known_root(&root) {
            return Err(PoolError::RootNotInHistory(root));
        }
        debug!(stage = %WithdrawalStage::RootChecked);

        let nullifier_hash = compute_nullifier_hash(&self.hasher, nullifier);
        self.nullifiers.ensure_unspent(&nullifier_hash)?;
        debug!(stage = %WithdrawalStage::NullifierChecked, %nullifier_hash);

        let max = self.max_withdrawal_on_amount(withdrawal_key.amount);
        if amount > max {
            return Err(PoolError::WithdrawalExceedsMax { requested: amount, max });
        }
        debug!(stage = %WithdrawalStage::AmountChecked, %max);

        let signals = PublicSignals::assemble(
            root,
            withdrawal_key.standardize(&self.hasher)?,
            nullifier_hash,
            recipient,
            amount,
        )?;
        if !self.gate.verify(&proof, &signals) {
            return Err(PoolError::ProofNotVerified);
        }
        debug!(stage = %WithdrawalStage::ProofChecked);

        self.nullifiers.consume(nullifier_hash)?;
        if let Err(err) = Settlement::new().push(asset, recipient, amount).execute(gateway) {
            self.nullifiers.revert(&nullifier_hash);
            warn!(%nullifier_hash, %err, "withdrawal aborted during settlement");
            return Err(err.into());
        }

        info!(stage = %WithdrawalStage::Settled, %nullifier_hash, %asset, %recipient, %amount, "withdrawal");
        Ok(WithdrawReceipt { nullifier_hash, asset, recipient, amount })
    }

    // -------------------------------------------------------------------------
    //                              VIEWS
    // -------------------------------------------------------------------------

    pub fn root(&self) -> Field {
        self.tree.root()
    }

    pub fn is_known_root(&self, root: &Field) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn leaf_count(&self) -> u64 {
        self.tree.leaf_count()
    }

    pub fn tree(&self) -> &CommitmentTree<H> {
        &self.tree
    }

    pub fn deposit_delta(&self, key: &Field) -> DepositDelta {
        self.ledger.deposit_delta(key)
    }

    pub fn user_has_deposited(&self, user: Address, asset: Address) -> bool {
        self.ledger.user_has_deposited(user, asset)
    }

    pub fn max_withdrawal_on_amount(&self, amount: U256) -> U256 {
        self.policy.max_withdrawal_on_amount(amount)
    }

    /// Whether the nullifier (not its hash) has been used.
    pub fn is_spent(&self, nullifier: Field) -> bool {
        self.nullifiers.is_spent(&compute_nullifier_hash(&self.hasher, nullifier))
    }

    /// The signal vector a withdrawal with these inputs is verified against.
    pub fn public_signals(
        &self,
        root: Field,
        withdrawal_key: &WithdrawalKey,
        nullifier: Field,
        recipient: Address,
        amount: U256,
    ) -> Result<PublicSignals, PoolError> {
        PublicSignals::assemble(
            root,
            withdrawal_key.standardize(&self.hasher)?,
            compute_nullifier_hash(&self.hasher, nullifier),
            recipient,
            amount,
        )
    }

    pub fn fees(&self) -> &FeeLedger {
        &self.fees
    }

    pub fn policy(&self) -> FeePolicy {
        self.policy
    }

    pub fn collectors(&self) -> FeeCollectors {
        self.collectors
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}
