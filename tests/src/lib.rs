#[cfg(test)]
mod tests {
    use escrow_pool_lib::*;
    use proptest::prelude::*;

    const OWNER: Address = [0x11u8; 20];
    const CUSTODY: Address = [0x22u8; 20];
    const ALICE: Address = [0x33u8; 20];
    const BOB: Address = [0x44u8; 20];
    const TOKEN: Address = [0xAAu8; 20];
    const OTHER_TOKEN: Address = [0xBBu8; 20];

    const NOW: u64 = 1_700_000_000;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn fresh_pool(config: PoolConfig) -> ShieldedPool<InMemoryLedger> {
        init_tracing();
        let mut ledger = InMemoryLedger::new(CUSTODY);
        ledger.credit(TOKEN, ALICE, 10_000_000);
        ledger.credit(OTHER_TOKEN, ALICE, 10_000_000);
        let mut pool = ShieldedPool::new(OWNER, CUSTODY, config, ledger);
        pool.add_supported_token(OWNER, TOKEN).unwrap();
        pool.add_supported_token(OWNER, OTHER_TOKEN).unwrap();
        pool
    }

    /// Deposit a fresh note, feed the off-system tree, advance the root,
    /// and lock the commitment behind an HTLC. Returns the note so the
    /// caller holds the nullifier.
    fn lock_htlc(
        pool: &mut ShieldedPool<InMemoryLedger>,
        tree: &mut IncrementalMerkleTree,
        tag: &[u8],
        secret: &[u8; 32],
        amount: u64,
        timelock: u64,
    ) -> Note {
        let mut nullifier_seed = tag.to_vec();
        nullifier_seed.extend_from_slice(b".nullifier");
        let note = Note {
            amount,
            blinding: keccak256(tag),
            nullifier: keccak256(&nullifier_seed),
        };
        let commitment = note.commitment();
        pool.deposit(ALICE, TOKEN, commitment, amount, NOW).unwrap();

        let idx = tree.insert(commitment);
        pool.advance_root(OWNER, tree.root()).unwrap();

        pool.create_htlc(
            OWNER,
            HtlcParams {
                token: TOKEN,
                nullifier: note.nullifier,
                root: tree.root(),
                commitment,
                amount,
                proof: &tree.proof(idx),
                hash_lock: hash_lock(secret),
                timelock,
            },
            NOW,
        )
        .unwrap();
        note
    }

    // --- double-spend safety ---

    #[test]
    fn at_most_one_withdrawal_per_nullifier() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let secret = keccak256(b"swap secret");
        let note = lock_htlc(&mut pool, &mut tree, b"ds", &secret, 500, NOW + 7_200);

        pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), NOW + 100)
            .unwrap();
        assert!(pool.is_nullifier_spent(&note.nullifier));

        // Any second attempt fails with the spent-nullifier rejection,
        // whichever branch it takes.
        assert_eq!(
            pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), NOW + 200),
            Err(PoolError::NullifierSpent)
        );
        assert_eq!(
            pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, None, NOW + 10_000),
            Err(PoolError::NullifierSpent)
        );
    }

    #[test]
    fn spent_nullifier_cannot_back_a_new_htlc() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let secret = keccak256(b"secret");
        let note = lock_htlc(&mut pool, &mut tree, b"reuse", &secret, 300, NOW + 7_200);
        pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), NOW + 100)
            .unwrap();

        // A fresh deposit proven against the current root still cannot
        // reuse the consumed nullifier.
        let commitment = keccak256(b"fresh commitment");
        pool.deposit(ALICE, TOKEN, commitment, 300, NOW).unwrap();
        let idx = tree.insert(commitment);
        pool.advance_root(OWNER, tree.root()).unwrap();

        let attempt = pool.create_htlc(
            OWNER,
            HtlcParams {
                token: TOKEN,
                nullifier: note.nullifier,
                root: tree.root(),
                commitment,
                amount: 300,
                proof: &tree.proof(idx),
                hash_lock: hash_lock(&secret),
                timelock: NOW + 7_200,
            },
            NOW,
        );
        assert_eq!(attempt, Err(PoolError::NullifierSpent));
    }

    // --- root window correctness ---

    fn nth_root(i: u64) -> [u8; 32] {
        keccak256(&i.to_be_bytes())
    }

    #[test]
    fn root_window_retains_one_hundred_roots() {
        let mut pool = fresh_pool(PoolConfig::default());
        for i in 1..=100u64 {
            pool.advance_root(OWNER, nth_root(i)).unwrap();
        }
        for i in 1..=100u64 {
            assert!(pool.is_known_root(&nth_root(i)), "root {i} should be known");
        }
        assert_eq!(pool.get_current_root(), Some(nth_root(100)));

        pool.advance_root(OWNER, nth_root(101)).unwrap();
        assert!(!pool.is_known_root(&nth_root(1)), "oldest root must age out");
        for i in 2..=101u64 {
            assert!(pool.is_known_root(&nth_root(i)), "root {i} should remain known");
        }
    }

    #[test]
    fn stale_root_inside_window_still_verifies() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);

        let note = Note {
            amount: 100,
            blinding: keccak256(b"stale"),
            nullifier: keccak256(b"stale.nullifier"),
        };
        let commitment = note.commitment();
        pool.deposit(ALICE, TOKEN, commitment, 100, NOW).unwrap();
        let idx = tree.insert(commitment);
        let stale_root = tree.root();
        let proof = tree.proof(idx);
        pool.advance_root(OWNER, stale_root).unwrap();

        // The root moves on while the proof is in flight.
        for i in 1..=50u64 {
            pool.advance_root(OWNER, nth_root(i)).unwrap();
        }

        pool.create_htlc(
            OWNER,
            HtlcParams {
                token: TOKEN,
                nullifier: note.nullifier,
                root: stale_root,
                commitment,
                amount: 100,
                proof: &proof,
                hash_lock: hash_lock(&keccak256(b"s")),
                timelock: NOW + 7_200,
            },
            NOW,
        )
        .unwrap();
    }

    proptest! {
        /// Whatever the acceptance order (duplicates included), a root is
        /// known iff it occurs among the last `ROOT_HISTORY_SIZE` accepted
        /// roots.
        #[test]
        fn ring_membership_matches_sliding_window(
            sequence in proptest::collection::vec(0u8..8, 0..300)
        ) {
            let mut ring = RootHistoryRing::new();
            let accepted: Vec<[u8; 32]> = sequence
                .iter()
                .map(|&i| keccak256(&[i]))
                .collect();
            for root in &accepted {
                ring.advance(*root).unwrap();
            }

            let window_start = accepted.len().saturating_sub(ROOT_HISTORY_SIZE);
            let window = &accepted[window_start..];
            for i in 0u8..8 {
                let root = keccak256(&[i]);
                prop_assert_eq!(ring.is_known(&root), window.contains(&root));
            }
            if let Some(last) = accepted.last() {
                prop_assert_eq!(ring.current_root(), Some(*last));
            }
        }
    }

    // --- timelock boundaries ---

    #[test]
    fn timelock_window_bounds_are_exclusive() {
        let cases = [
            (NOW + 3_600, Err(PoolError::TimelockOutOfRange)),
            (NOW + 3_601, Ok(())),
            (NOW + 604_800, Err(PoolError::TimelockOutOfRange)),
            (NOW + 604_799, Ok(())),
        ];

        for (case, (timelock, expected)) in cases.iter().enumerate() {
            let mut pool = fresh_pool(PoolConfig::default());
            let mut tree = IncrementalMerkleTree::new(8);

            let note = Note {
                amount: 100,
                blinding: keccak256(&[case as u8, 1]),
                nullifier: keccak256(&[case as u8, 2]),
            };
            let commitment = note.commitment();
            pool.deposit(ALICE, TOKEN, commitment, 100, NOW).unwrap();
            let idx = tree.insert(commitment);
            pool.advance_root(OWNER, tree.root()).unwrap();

            let result = pool
                .create_htlc(
                    OWNER,
                    HtlcParams {
                        token: TOKEN,
                        nullifier: note.nullifier,
                        root: tree.root(),
                        commitment,
                        amount: 100,
                        proof: &tree.proof(idx),
                        hash_lock: hash_lock(&keccak256(b"s")),
                        timelock: *timelock,
                    },
                    NOW,
                )
                .map(|_| ());
            assert_eq!(result, *expected, "timelock = now + {}", timelock - NOW);
        }
    }

    // --- redemption and refund policy ---

    #[test]
    fn redemption_needs_preexpiry_and_correct_secret() {
        let timelock = NOW + 7_200;
        let secret = keccak256(b"the swap secret");

        // Wrong secret fails regardless of time.
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let note = lock_htlc(&mut pool, &mut tree, b"r1", &secret, 250, timelock);
        let wrong = keccak256(b"not the secret");
        assert_eq!(
            pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(wrong), NOW + 10),
            Err(PoolError::WrongSecret)
        );
        assert_eq!(
            pool.get_htlc(&note.nullifier).unwrap().state,
            HtlcState::Active
        );

        // Correct secret after expiry fails too (exactly at the timelock
        // counts as expired).
        assert_eq!(
            pool.withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), timelock),
            Err(PoolError::TimelockExpired)
        );

        // Correct secret before expiry pays the recipient.
        let record = pool
            .withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), timelock - 1)
            .unwrap();
        assert_eq!(record.kind, WithdrawKind::Redemption);
        assert_eq!(
            pool.get_htlc(&note.nullifier).unwrap().state,
            HtlcState::Redeemed
        );
        assert_eq!(pool.get_balance(TOKEN), 0);
    }

    #[test]
    fn refund_needs_postexpiry() {
        let timelock = NOW + 7_200;
        let secret = keccak256(b"unused secret");
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let note = lock_htlc(&mut pool, &mut tree, b"rf", &secret, 250, timelock);

        assert_eq!(
            pool.withdraw(OWNER, TOKEN, note.nullifier, ALICE, None, timelock - 1),
            Err(PoolError::TimelockNotReached)
        );

        // Exactly at the timelock the refund branch opens.
        let record = pool
            .withdraw(OWNER, TOKEN, note.nullifier, ALICE, None, timelock)
            .unwrap();
        assert_eq!(record.kind, WithdrawKind::Refund);
        assert_eq!(
            pool.get_htlc(&note.nullifier).unwrap().state,
            HtlcState::Refunded
        );
    }

    #[test]
    fn withdraw_rejects_token_mismatch() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let secret = keccak256(b"secret");
        let note = lock_htlc(&mut pool, &mut tree, b"tm", &secret, 250, NOW + 7_200);

        // OTHER_TOKEN is supported, but the record is bound to TOKEN.
        assert_eq!(
            pool.withdraw(OWNER, OTHER_TOKEN, note.nullifier, BOB, Some(secret), NOW + 10),
            Err(PoolError::TokenMismatch)
        );
    }

    // --- proof adjudication ---

    #[test]
    fn degenerate_single_leaf_proof_verifies() {
        let mut pool = fresh_pool(PoolConfig::default());
        let note = Note {
            amount: 100,
            blinding: keccak256(b"lonely"),
            nullifier: keccak256(b"lonely.nullifier"),
        };
        let commitment = note.commitment();
        pool.deposit(ALICE, TOKEN, commitment, 100, NOW).unwrap();

        // Single-leaf tree: the commitment IS the root.
        pool.advance_root(OWNER, commitment).unwrap();
        pool.create_htlc(
            OWNER,
            HtlcParams {
                token: TOKEN,
                nullifier: note.nullifier,
                root: commitment,
                commitment,
                amount: 100,
                proof: &[],
                hash_lock: hash_lock(&keccak256(b"s")),
                timelock: NOW + 7_200,
            },
            NOW,
        )
        .unwrap();
    }

    #[test]
    fn create_htlc_rejects_unknown_root_and_bad_proof() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);

        let note = Note {
            amount: 100,
            blinding: keccak256(b"bp"),
            nullifier: keccak256(b"bp.nullifier"),
        };
        let commitment = note.commitment();
        pool.deposit(ALICE, TOKEN, commitment, 100, NOW).unwrap();
        let idx = tree.insert(commitment);
        let proof = tree.proof(idx);

        let params = HtlcParams {
            token: TOKEN,
            nullifier: note.nullifier,
            root: tree.root(),
            commitment,
            amount: 100,
            proof: &proof,
            hash_lock: hash_lock(&keccak256(b"s")),
            timelock: NOW + 7_200,
        };

        // Root was never advanced.
        assert_eq!(
            pool.create_htlc(OWNER, params, NOW),
            Err(PoolError::UnknownRoot)
        );

        // Root known, but the proof binds a different commitment.
        pool.advance_root(OWNER, tree.root()).unwrap();
        let forged = HtlcParams {
            commitment: keccak256(b"someone else's commitment"),
            ..params
        };
        assert_eq!(
            pool.create_htlc(OWNER, forged, NOW),
            Err(PoolError::InvalidProof)
        );
    }

    // --- deposit cap variants ---

    #[test]
    fn bounded_pool_enforces_the_cap() {
        let mut pool = fresh_pool(PoolConfig::bounded(10_000));
        pool.deposit(ALICE, TOKEN, keccak256(b"at cap"), 10_000, NOW)
            .unwrap();
        assert_eq!(
            pool.deposit(ALICE, TOKEN, keccak256(b"over cap"), 10_001, NOW),
            Err(PoolError::DepositCapExceeded)
        );
    }

    #[test]
    fn unbounded_pool_accepts_amounts_above_the_bounded_cap() {
        let mut pool = fresh_pool(PoolConfig::unbounded());
        pool.deposit(ALICE, TOKEN, keccak256(b"large"), 10_001, NOW)
            .unwrap();
        assert_eq!(
            pool.deposit(ALICE, TOKEN, keccak256(b"still zero"), 0, NOW),
            Err(PoolError::ZeroAmount)
        );
    }

    // --- record fixtures ---

    #[test]
    fn emitted_records_serialize_round_trip() {
        let mut pool = fresh_pool(PoolConfig::default());
        let mut tree = IncrementalMerkleTree::new(8);
        let secret = keccak256(b"fixture secret");
        let note = lock_htlc(&mut pool, &mut tree, b"fx", &secret, 750, NOW + 7_200);

        let withdrawal = pool
            .withdraw(OWNER, TOKEN, note.nullifier, BOB, Some(secret), NOW + 60)
            .unwrap();

        let json = serde_json::to_string_pretty(&withdrawal).unwrap();
        let parsed: WithdrawalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, withdrawal);
        assert_eq!(parsed.amount, 750);
        assert_eq!(hex::encode(parsed.recipient), hex::encode(BOB));

        let htlc = *pool.get_htlc(&note.nullifier).unwrap();
        let json = serde_json::to_string(&htlc).unwrap();
        let parsed: VirtualHtlc = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, htlc);
    }
}
