//! End-to-end run: deposit → withdraw against an in-memory pool.
//!
//! Walks the full lifecycle with the development proof gate:
//!   1. Two deposits (one token, one native) with freshly generated keys
//!   2. Merkle inclusion proofs checked against the current root
//!   3. Withdrawal of the first deposit up to its cap
//!   4. Replay of the same nullifier, which must fail
//!   5. Final balances, fees and nullifier state
//!
//! Usage:
//!   cargo run --release -p privacy-pool-script --bin e2e
//!
//! Optional env vars (from .env), on top of the pool config variables:
//!   DEPOSIT_AMOUNT   - Token deposit in base units (default: 100000000000000000234)
//!   NATIVE_AMOUNT    - Native deposit in base units (default: 1000000000000000000)
//!   WITHDRAW_AMOUNT  - Token withdrawal (default: the cap for DEPOSIT_AMOUNT)

use alloy_primitives::{Address, U256};
use anyhow::{ensure, Context, Result};
use privacy_pool_lib::{
    generate_keys, verify_merkle_proof, DepositRequest, Field, InMemoryGateway, KeccakHasher, Pool,
    PoolError, SignalDigestGate, WithdrawRequest, NATIVE_ASSET,
};
use privacy_pool_script::{load_config, setup_logger};
use rand::Rng;

const CUSTODY: Address = Address::repeat_byte(0xee);
const DEPOSITOR: Address = Address::repeat_byte(0xa1);
const RECIPIENT: Address = Address::repeat_byte(0xde);
const TOKEN: Address = Address::repeat_byte(0x70);

fn env_amount(name: &str, default: U256) -> Result<U256> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid {name}")),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<()> {
    setup_logger();
    let config = load_config(None)?;

    println!("\n=== Privacy Pool E2E ===\n");

    let token_amount = env_amount("DEPOSIT_AMOUNT", U256::from(100_000_000_000_000_000_234u128))?;
    let native_amount = env_amount("NATIVE_AMOUNT", U256::from(10u64.pow(18)))?;

    let mut pool = Pool::new(&config, KeccakHasher, SignalDigestGate)?;
    let mut gateway = InMemoryGateway::new(CUSTODY);
    gateway.mint(TOKEN, DEPOSITOR, token_amount);
    gateway.mint(NATIVE_ASSET, DEPOSITOR, native_amount);

    let cap = pool.max_withdrawal_on_amount(token_amount);
    let withdraw_amount = env_amount("WITHDRAW_AMOUNT", cap)?;

    println!("Tree:             {} levels, {} roots kept", config.tree_levels, config.root_history_size);
    println!("Fee:              {}% ({}/{} split)", config.fee_rate_percent, config.primary_collector_percent, 100 - config.primary_collector_percent);
    println!("Token deposit:    {token_amount}");
    println!("Native deposit:   {native_amount}");
    println!("Withdraw amount:  {withdraw_amount} (cap {cap})\n");

    // -- 1. Deposits ----------------------------------------------------------
    let mut rng = rand::thread_rng();
    let token_secret: [u8; 32] = rng.gen();
    let native_secret: [u8; 32] = rng.gen();

    let (token_dkey, token_wkey) = generate_keys(pool.hasher(), TOKEN, token_amount, &token_secret)?;
    let (native_dkey, _) = generate_keys(pool.hasher(), NATIVE_ASSET, native_amount, &native_secret)?;

    println!("[1] Depositing {token_amount} of {TOKEN}...");
    let token_receipt = pool.deposit(
        &mut gateway,
        &DepositRequest {
            depositor: DEPOSITOR,
            key_hash: token_dkey.key_hash,
            asset: TOKEN,
            amount: token_amount,
            attached_value: U256::ZERO,
        },
    )?;
    println!("    Leaf {} at index {}", token_receipt.leaf, token_receipt.leaf_index);
    println!("    Credited {}", token_receipt.delta.current_deposit);

    println!("    Depositing {native_amount} native...");
    let native_receipt = pool.deposit(
        &mut gateway,
        &DepositRequest {
            depositor: DEPOSITOR,
            key_hash: native_dkey.key_hash,
            asset: NATIVE_ASSET,
            amount: native_amount,
            attached_value: native_amount,
        },
    )?;
    println!("    Leaf {} at index {}", native_receipt.leaf, native_receipt.leaf_index);

    // -- 2. Inclusion proofs --------------------------------------------------
    println!("[2] Checking inclusion proofs against root {}...", pool.root());
    for receipt in [&token_receipt, &native_receipt] {
        let proof = pool
            .tree()
            .proof(receipt.leaf_index)
            .context("no proof for inserted leaf")?;
        ensure!(
            verify_merkle_proof(pool.hasher(), receipt.leaf, &proof, pool.root()),
            "inclusion proof for leaf {} does not verify",
            receipt.leaf_index
        );
    }
    println!("    Both leaves included: OK");

    // -- 3. Withdrawal --------------------------------------------------------
    println!("[3] Withdrawing {withdraw_amount} to {RECIPIENT}...");
    let nullifier = Field::reduce(U256::from_be_bytes(rng.gen::<[u8; 32]>()));
    let root = pool.root();
    let signals = pool.public_signals(root, &token_wkey, nullifier, RECIPIENT, withdraw_amount)?;
    println!("    Public signals: 0x{}", hex::encode(signals.to_be_bytes()));
    let request = WithdrawRequest {
        root,
        withdrawal_key: token_wkey,
        proof: SignalDigestGate::prove(&signals),
        nullifier,
        recipient: RECIPIENT,
        amount: withdraw_amount,
    };
    let withdrawal = pool.withdraw(&mut gateway, &request)?;
    println!("    Nullifier hash {}", withdrawal.nullifier_hash);

    // -- 4. Replay ------------------------------------------------------------
    println!("[4] Replaying the same nullifier...");
    match pool.withdraw(&mut gateway, &request) {
        Err(PoolError::NullifierUsed(_)) => println!("    Rejected with NullifierUsed: OK"),
        other => anyhow::bail!("replay was not rejected: {other:?}"),
    }

    // -- 5. Final state -------------------------------------------------------
    println!("\n[5] Verifying final state...");
    ensure!(pool.is_spent(nullifier), "Nullifier not spent!");
    println!("    Nullifier spent: OK");

    let received = gateway.balance_of(TOKEN, RECIPIENT);
    ensure!(received == withdraw_amount, "recipient received {received}, expected {withdraw_amount}");
    println!("    Recipient balance: {received}");

    let collectors = pool.collectors();
    for asset in [TOKEN, NATIVE_ASSET] {
        let fees = pool.fees().collected(asset);
        ensure!(gateway.balance_of(asset, collectors.primary) == fees.primary, "primary fee mismatch for {asset}");
        ensure!(gateway.balance_of(asset, collectors.secondary) == fees.secondary, "secondary fee mismatch for {asset}");
        println!("    Fees in {asset}: {} / {}", fees.primary, fees.secondary);
    }
    println!("    Leaf count: {}", pool.leaf_count());

    println!("\n=== E2E Passed! ===\n");
    Ok(())
}
