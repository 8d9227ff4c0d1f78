#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};
    use anyhow::Result;
    use privacy_pool_lib::config::{DEFAULT_PRIMARY_COLLECTOR, DEFAULT_SECONDARY_COLLECTOR};
    use privacy_pool_lib::deployment::{pool_interface, DeploymentBook};
    use privacy_pool_lib::*;
    use rand::Rng;

    const CUSTODY: Address = Address::repeat_byte(0xee);
    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const RECIPIENT: Address = Address::repeat_byte(0xde);
    /// Never funded, so any balance it holds came out of the pool.
    const CAROL: Address = Address::repeat_byte(0xca);
    const USDC: Address = Address::repeat_byte(0x70);

    type TestPool = Pool<KeccakHasher, SignalDigestGate>;

    /// 100.000000000000000234 units of an 18-decimal asset.
    fn scenario_amount() -> U256 {
        U256::from(100_000_000_000_000_000_234u128)
    }

    fn new_pool(tree_levels: usize, root_history_size: usize) -> TestPool {
        let config = PoolConfig { tree_levels, root_history_size, ..Default::default() };
        Pool::new(&config, KeccakHasher, SignalDigestGate).unwrap()
    }

    fn funded_gateway() -> InMemoryGateway {
        let mut gw = InMemoryGateway::new(CUSTODY);
        for user in [ALICE, BOB] {
            gw.mint(USDC, user, U256::from(10u128.pow(24)));
            gw.mint(NATIVE_ASSET, user, U256::from(10u128.pow(24)));
        }
        gw
    }

    fn random_secret() -> [u8; 32] {
        rand::thread_rng().gen()
    }

    fn random_nullifier() -> Field {
        Field::reduce(U256::from_be_bytes(rand::thread_rng().gen::<[u8; 32]>()))
    }

    fn deposit_request(depositor: Address, key: &DepositKey, attached_value: U256) -> DepositRequest {
        DepositRequest {
            depositor,
            key_hash: key.key_hash,
            asset: key.asset,
            amount: key.amount,
            attached_value,
        }
    }

    /// Build a withdrawal against the pool's current root with a proof the
    /// development gate accepts.
    fn proven_withdrawal(
        pool: &TestPool,
        key: &WithdrawalKey,
        nullifier: Field,
        recipient: Address,
        amount: U256,
    ) -> WithdrawRequest {
        let root = pool.root();
        let signals = pool.public_signals(root, key, nullifier, recipient, amount).unwrap();
        WithdrawRequest {
            root,
            withdrawal_key: *key,
            proof: SignalDigestGate::prove(&signals),
            nullifier,
            recipient,
            amount,
        }
    }

    #[test]
    fn test_deposit_then_withdraw_lifecycle() -> Result<()> {
        let mut pool = new_pool(20, 30);
        let mut gw = funded_gateway();
        let amount = scenario_amount();
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, amount, &random_secret())?;

        let receipt = pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;
        let leaf = dkey.standardize(&KeccakHasher)?;
        assert_eq!(receipt.leaf, leaf);
        assert_eq!(receipt.leaf_index, 0);

        let delta = pool.deposit_delta(&leaf);
        let fee = U256::from(1_000_000_000_000_000_002u128);
        assert_eq!(delta.info.depositor, ALICE);
        assert_eq!(delta.info.asset, USDC);
        assert_eq!(delta.info.amount_after_deposit, amount - fee);
        assert_eq!(delta.current_deposit, amount - fee);
        assert_eq!(delta.unique_deposits, 1);
        assert!(pool.user_has_deposited(ALICE, USDC));
        assert!(!pool.user_has_deposited(BOB, USDC));

        let max = pool.max_withdrawal_on_amount(amount);
        assert_eq!(max, delta.current_deposit);

        let nullifier = random_nullifier();
        let request = proven_withdrawal(&pool, &wkey, nullifier, RECIPIENT, max);
        let withdrawn = pool.withdraw(&mut gw, &request)?;

        assert_eq!(withdrawn.nullifier_hash, compute_nullifier_hash(&KeccakHasher, nullifier));
        assert!(pool.is_spent(nullifier));
        assert_eq!(gw.balance_of(USDC, RECIPIENT), max);
        assert_eq!(gw.balance_of(USDC, CUSTODY), U256::ZERO);
        Ok(())
    }

    #[test]
    fn test_fee_split_reaches_collectors() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let (dkey, _) = generate_keys(&KeccakHasher, USDC, scenario_amount(), b"fees")?;

        let receipt = pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        let primary = U256::from(900_000_000_000_000_001u128);
        let secondary = U256::from(100_000_000_000_000_001u128);
        assert_eq!(receipt.fee, FeeSplit { primary, secondary });
        assert_eq!(gw.balance_of(USDC, DEFAULT_PRIMARY_COLLECTOR), primary);
        assert_eq!(gw.balance_of(USDC, DEFAULT_SECONDARY_COLLECTOR), secondary);
        assert_eq!(pool.fees().collected(USDC), receipt.fee);
        Ok(())
    }

    #[test]
    fn test_reused_key_leaves_ledger_unchanged() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let (dkey, _) = generate_keys(&KeccakHasher, USDC, U256::from(5_000), b"dup")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        let leaf = dkey.standardize(&KeccakHasher)?;
        let delta = pool.deposit_delta(&leaf);
        let root = pool.root();
        let bob_balance = gw.balance_of(USDC, BOB);

        let err = pool.deposit(&mut gw, &deposit_request(BOB, &dkey, U256::ZERO)).unwrap_err();

        assert_eq!(err, PoolError::KeyAlreadyUsed(leaf));
        assert_eq!(err.name(), "KeyAlreadyUsed");
        assert_eq!(pool.deposit_delta(&leaf), delta);
        assert_eq!(pool.root(), root);
        assert_eq!(pool.leaf_count(), 1);
        assert_eq!(gw.balance_of(USDC, BOB), bob_balance);
        assert!(!pool.user_has_deposited(BOB, USDC));
        Ok(())
    }

    #[test]
    fn test_native_deposit_attached_value() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let amount = U256::from(10u64.pow(18));

        let (short, _) = generate_keys(&KeccakHasher, NATIVE_ASSET, amount, b"short")?;
        let err = pool
            .deposit(&mut gw, &deposit_request(ALICE, &short, amount - U256::from(1)))
            .unwrap_err();
        assert_eq!(err.name(), "ETHSentLessThanDeposit");
        assert_eq!(pool.leaf_count(), 0);

        let (exact, _) = generate_keys(&KeccakHasher, NATIVE_ASSET, amount, b"exact")?;
        let receipt = pool.deposit(&mut gw, &deposit_request(ALICE, &exact, amount))?;
        assert_eq!(receipt.delta.current_deposit, amount - U256::from(10u64.pow(16)));

        let (excess, _) = generate_keys(&KeccakHasher, NATIVE_ASSET, amount, b"excess")?;
        let attached = amount * U256::from(2);
        let receipt = pool.deposit(&mut gw, &deposit_request(ALICE, &excess, attached))?;
        assert_eq!(receipt.fee.total(), U256::from(2 * 10u64.pow(16)));
        assert_eq!(pool.leaf_count(), 2);
        assert_eq!(pool.deposit_delta(&receipt.leaf).unique_deposits, 2);
        Ok(())
    }

    #[test]
    fn test_withdrawal_cap_boundary() -> Result<()> {
        let config = PoolConfig { tree_levels: 8, withdrawal_cap_percent: 50, ..Default::default() };
        let mut pool = Pool::new(&config, KeccakHasher, SignalDigestGate)?;
        let mut gw = funded_gateway();
        let amount = U256::from(1_000_000u64);
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, amount, b"cap")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        let cap = pool.max_withdrawal_on_amount(amount);
        assert_eq!(cap, U256::from(495_000u64));

        let over = proven_withdrawal(&pool, &wkey, random_nullifier(), RECIPIENT, cap + U256::from(1));
        assert_eq!(
            pool.withdraw(&mut gw, &over),
            Err(PoolError::WithdrawalExceedsMax { requested: cap + U256::from(1), max: cap })
        );
        assert!(!pool.is_spent(over.nullifier));

        let at = proven_withdrawal(&pool, &wkey, random_nullifier(), RECIPIENT, cap);
        pool.withdraw(&mut gw, &at)?;
        assert_eq!(gw.balance_of(USDC, RECIPIENT), cap);
        Ok(())
    }

    #[test]
    fn test_nullifier_cannot_be_reused() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let amount = U256::from(1_000_000u64);
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, amount, b"nul")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        let nullifier = random_nullifier();
        let first = proven_withdrawal(&pool, &wkey, nullifier, RECIPIENT, U256::from(100));
        pool.withdraw(&mut gw, &first)?;

        let second = proven_withdrawal(&pool, &wkey, nullifier, CAROL, U256::from(100));
        let err = pool.withdraw(&mut gw, &second).unwrap_err();
        assert_eq!(err, PoolError::NullifierUsed(compute_nullifier_hash(&KeccakHasher, nullifier)));
        assert_eq!(gw.balance_of(USDC, CAROL), U256::ZERO);
        Ok(())
    }

    #[test]
    fn test_root_window_eviction() -> Result<()> {
        let history = 3;
        let mut pool = new_pool(8, history);
        let mut gw = funded_gateway();
        let amount = U256::from(1_000u64);
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, amount, b"window")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        let stale = proven_withdrawal(&pool, &wkey, random_nullifier(), RECIPIENT, U256::from(10));

        // The root stays usable while it is among the last `history` roots.
        for n in 0..(history - 1) {
            let (k, _) = generate_keys(&KeccakHasher, USDC, amount, format!("filler-{n}").as_bytes())?;
            pool.deposit(&mut gw, &deposit_request(BOB, &k, U256::ZERO))?;
        }
        assert!(pool.is_known_root(&stale.root));

        let (k, _) = generate_keys(&KeccakHasher, USDC, amount, b"evicting")?;
        pool.deposit(&mut gw, &deposit_request(BOB, &k, U256::ZERO))?;
        assert!(!pool.is_known_root(&stale.root));
        assert_eq!(pool.withdraw(&mut gw, &stale), Err(PoolError::RootNotInHistory(stale.root)));
        Ok(())
    }

    #[test]
    fn test_tampered_proof_is_rejected() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, U256::from(1_000u64), b"proof")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::ZERO))?;

        // Proof bound to one recipient, request redirected to another.
        let mut request = proven_withdrawal(&pool, &wkey, random_nullifier(), RECIPIENT, U256::from(10));
        request.recipient = CAROL;

        assert_eq!(pool.withdraw(&mut gw, &request), Err(PoolError::ProofNotVerified));
        assert!(!pool.is_spent(request.nullifier));
        assert_eq!(gw.balance_of(USDC, CAROL), U256::ZERO);
        Ok(())
    }

    #[test]
    fn test_native_withdrawal_pays_recipient() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let amount = U256::from(10u64.pow(18));
        let (dkey, wkey) = generate_keys(&KeccakHasher, NATIVE_ASSET, amount, &random_secret())?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, amount))?;

        let cap = pool.max_withdrawal_on_amount(amount);
        let custody = gw.balance_of(NATIVE_ASSET, CUSTODY);
        assert_eq!(custody, cap);

        let request = proven_withdrawal(&pool, &wkey, random_nullifier(), CAROL, cap);
        let receipt = pool.withdraw(&mut gw, &request)?;

        assert_eq!(receipt.asset, NATIVE_ASSET);
        assert_eq!(gw.balance_of(NATIVE_ASSET, CAROL), cap);
        assert_eq!(gw.balance_of(NATIVE_ASSET, CUSTODY), custody - cap);
        assert!(pool.is_spent(request.nullifier));
        Ok(())
    }

    #[test]
    fn test_rejecting_recipient_keeps_nullifier_unspent() -> Result<()> {
        let mut pool = new_pool(8, 30);
        let mut gw = funded_gateway();
        let (dkey, wkey) = generate_keys(&KeccakHasher, NATIVE_ASSET, U256::from(1_000u64), b"rej")?;
        pool.deposit(&mut gw, &deposit_request(ALICE, &dkey, U256::from(1_000u64)))?;
        gw.reject_transfers_to(RECIPIENT);
        let custody = gw.balance_of(NATIVE_ASSET, CUSTODY);

        let request = proven_withdrawal(&pool, &wkey, random_nullifier(), RECIPIENT, U256::from(500));
        let err = pool.withdraw(&mut gw, &request).unwrap_err();

        assert_eq!(err.name(), "TransferFailed");
        assert!(!pool.is_spent(request.nullifier));
        assert_eq!(gw.balance_of(NATIVE_ASSET, CUSTODY), custody);
        Ok(())
    }

    #[test]
    fn test_tree_full() -> Result<()> {
        let mut pool = new_pool(2, 30);
        let mut gw = funded_gateway();
        for n in 0..4u8 {
            let (k, _) = generate_keys(&KeccakHasher, USDC, U256::from(100u64), &[n])?;
            pool.deposit(&mut gw, &deposit_request(ALICE, &k, U256::ZERO))?;
        }
        let (k, _) = generate_keys(&KeccakHasher, USDC, U256::from(100u64), b"fifth")?;
        let balance = gw.balance_of(USDC, ALICE);
        let err = pool.deposit(&mut gw, &deposit_request(ALICE, &k, U256::ZERO)).unwrap_err();
        assert_eq!(err, PoolError::TreeFull { capacity: 4 });
        assert_eq!(gw.balance_of(USDC, ALICE), balance);
        Ok(())
    }

    #[test]
    fn test_merkle_proofs_for_every_deposit() -> Result<()> {
        let mut pool = new_pool(6, 30);
        let mut gw = funded_gateway();
        let mut leaves = Vec::new();
        for _ in 0..5 {
            let (k, _) = generate_keys(&KeccakHasher, USDC, U256::from(777u64), &random_secret())?;
            leaves.push(pool.deposit(&mut gw, &deposit_request(ALICE, &k, U256::ZERO))?.leaf);
        }
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = pool.tree().proof(i as u64).unwrap();
            assert_eq!(proof.len(), 6);
            assert!(verify_merkle_proof(&KeccakHasher, *leaf, &proof, pool.root()));
        }
        assert!(pool.tree().proof(5).is_none());
        Ok(())
    }

    #[test]
    fn test_two_pools_agree() -> Result<()> {
        let mut a = new_pool(10, 30);
        let mut b = new_pool(10, 30);
        let mut gw_a = funded_gateway();
        let mut gw_b = funded_gateway();
        for n in 0..6u64 {
            let (k, _) = generate_keys(&KeccakHasher, USDC, U256::from(1_000 + n), &n.to_be_bytes())?;
            let ra = a.deposit(&mut gw_a, &deposit_request(ALICE, &k, U256::ZERO))?;
            let rb = b.deposit(&mut gw_b, &deposit_request(ALICE, &k, U256::ZERO))?;
            assert_eq!(ra, rb);
        }
        assert_eq!(a.root(), b.root());
        Ok(())
    }

    #[test]
    fn test_raw_key_hex_round_trip() -> Result<()> {
        let (dkey, wkey) = generate_keys(&KeccakHasher, USDC, scenario_amount(), b"hex")?;
        let encoded = wkey.to_string();
        assert_eq!(hex::decode(encoded.trim_start_matches("0x"))?.len(), 84);
        let decoded: WithdrawalKey = encoded.parse()?;
        assert_eq!(decoded, wkey);
        assert_ne!(dkey.key_hash, wkey.key_hash);
        Ok(())
    }

    #[test]
    fn test_public_signals_packing() -> Result<()> {
        let pool = new_pool(8, 30);
        let (_, wkey) = generate_keys(&KeccakHasher, USDC, U256::from(600_000u64), b"pv")?;
        let nullifier = random_nullifier();
        let signals = pool.public_signals(pool.root(), &wkey, nullifier, RECIPIENT, U256::from(600_000u64))?;

        let pv = signals.to_be_bytes();
        assert_eq!(pv.len(), 160);
        assert_eq!(&pv[..32], &pool.root().to_be_bytes());
        assert_eq!(&pv[32..64], &wkey.standardize(&KeccakHasher)?.to_be_bytes());
        assert_eq!(&pv[64..96], &compute_nullifier_hash(&KeccakHasher, nullifier).to_be_bytes());
        assert_eq!(&pv[108..128], RECIPIENT.as_slice());
        Ok(())
    }

    #[test]
    fn test_deployment_records() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("privacy-pool-tests-{}", std::process::id()));
        let deployments = dir.join("deployments.json");
        let interface = dir.join("interface.json");

        let mut book = DeploymentBook::load_or_default(&deployments)?;
        book.upsert(31337, CUSTODY, [("USDC", USDC)]);
        book.save(&deployments)?;
        pool_interface().write_if_absent(&interface)?;

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&deployments)?)?;
        assert_eq!(
            json["31337"]["addressAndTokens"]["address"].as_str().map(str::to_lowercase),
            Some(CUSTODY.to_string().to_lowercase())
        );
        let iface: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&interface)?)?;
        assert!(iface["operations"].as_array().is_some_and(|ops| ops.len() >= 3));

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
