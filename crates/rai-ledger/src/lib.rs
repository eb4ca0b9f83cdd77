// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-LEDGER
//
// The pure block validator (spec §4.C), the gap cache that parks blocks
// whose dependency hasn't arrived yet (spec §4.D), and the rollback
// support an election's resolution uses to replace a losing fork head.
// None of these touch the network or consensus layer — all three operate
// purely against a rai_store::WriteTxn.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod gap_cache;
mod rollback;
mod validator;

pub use gap_cache::{ConfirmationGapCache, GapCache};
pub use rollback::{reorganize, undo_head};
pub use validator::{preferred_for_rebroadcast, process, Candidate, ProcessResult};

#[cfg(test)]
mod tests {
    use super::*;
    use rai_core::{Block, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};
    use rai_crypto::pow::ProofOfWork;
    use rai_crypto::{Account, BlockHash, KeyPair, Signature};
    use rai_store::Store;

    /// Accepts any work value — lets these tests focus on ledger state
    /// transitions rather than proof-of-work thresholds.
    struct AlwaysValidPow;
    impl ProofOfWork for AlwaysValidPow {
        fn verify(&self, _root: rai_crypto::Root, _nonce: u64) -> bool {
            true
        }
        fn generate(&self, _root: rai_crypto::Root) -> u64 {
            0
        }
        fn difficulty(&self, _root: rai_crypto::Root, _nonce: u64) -> u64 {
            0
        }
    }

    fn signed_open(kp: &KeyPair, source: BlockHash, representative: Account) -> Block {
        let mut block = OpenBlock {
            source,
            representative,
            account: kp.account,
            signature: Signature([0; 64]),
            work: 0,
        };
        let hash = Block::Open(block.clone()).signing_hash();
        block.signature = kp.sign(&hash.0);
        Block::Open(block)
    }

    fn signed_send(
        kp: &KeyPair,
        previous: BlockHash,
        destination: Account,
        balance_after_send: u128,
    ) -> Block {
        let mut block = SendBlock {
            previous,
            destination,
            balance_after_send,
            signature: Signature([0; 64]),
            work: 0,
        };
        let hash = Block::Send(block.clone()).signing_hash();
        block.signature = kp.sign(&hash.0);
        Block::Send(block)
    }

    fn signed_receive(kp: &KeyPair, previous: BlockHash, source: BlockHash) -> Block {
        let mut block = ReceiveBlock {
            previous,
            source,
            signature: Signature([0; 64]),
            work: 0,
        };
        let hash = Block::Receive(block.clone()).signing_hash();
        block.signature = kp.sign(&hash.0);
        Block::Receive(block)
    }

    fn signed_change(kp: &KeyPair, previous: BlockHash, representative: Account) -> Block {
        let mut block = ChangeBlock {
            previous,
            representative,
            signature: Signature([0; 64]),
            work: 0,
        };
        let hash = Block::Change(block.clone()).signing_hash();
        block.signature = kp.sign(&hash.0);
        Block::Change(block)
    }

    /// Seeds a genesis account directly: an open block with no predecessor
    /// pending entry, standing in for the network's real genesis bootstrap.
    fn seed_genesis(store: &Store, kp: &KeyPair, balance: u128) -> BlockHash {
        let mut txn = store.begin_write();
        let genesis_source = BlockHash([0xffu8; 32]);
        txn.put_pending(
            kp.account,
            genesis_source,
            rai_store::PendingRecord {
                sender: kp.account,
                amount: balance,
            },
        );
        txn.commit().unwrap();

        let mut txn = store.begin_write();
        let open = signed_open(kp, genesis_source, kp.account);
        let result = process(&mut txn, &open, &AlwaysValidPow);
        assert_eq!(result, ProcessResult::Progress);
        txn.commit().unwrap();
        open.hash()
    }

    #[test]
    fn open_then_send_then_receive_moves_balance() {
        let store = Store::open_temporary().unwrap();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let alice_open = seed_genesis(&store, &alice, 1_000);

        let mut txn = store.begin_write();
        let send = signed_send(&alice, alice_open, bob.account, 400);
        assert_eq!(process(&mut txn, &send, &AlwaysValidPow), ProcessResult::Progress);
        txn.commit().unwrap();
        let send_hash = send.hash();

        let mut txn = store.begin_write();
        let bob_open = signed_open(&bob, send_hash, bob.account);
        assert_eq!(
            process(&mut txn, &bob_open, &AlwaysValidPow),
            ProcessResult::Progress
        );
        txn.commit().unwrap();

        let read = store.begin_read();
        let alice_account = read.get_account(alice.account).unwrap();
        assert_eq!(alice_account.balance, 600);
        let bob_account = read.get_account(bob.account).unwrap();
        assert_eq!(bob_account.balance, 400);
    }

    #[test]
    fn replaying_a_block_is_rejected_as_old() {
        let store = Store::open_temporary().unwrap();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let alice_open_hash = seed_genesis(&store, &alice, 100);
        assert!(store.begin_read().block_exists(alice_open_hash));

        let mut txn = store.begin_write();
        let send = signed_send(&alice, alice_open_hash, bob.account, 0);
        assert_eq!(process(&mut txn, &send, &AlwaysValidPow), ProcessResult::Progress);
        txn.commit().unwrap();

        let mut replay_txn = store.begin_write();
        assert_eq!(
            process(&mut replay_txn, &send, &AlwaysValidPow),
            ProcessResult::Old
        );
    }

    #[test]
    fn second_send_from_same_frontier_forks() {
        let store = Store::open_temporary().unwrap();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let alice_open_hash = seed_genesis(&store, &alice, 1_000);

        let mut txn = store.begin_write();
        let send_a = signed_send(&alice, alice_open_hash, bob.account, 500);
        assert_eq!(process(&mut txn, &send_a, &AlwaysValidPow), ProcessResult::Progress);
        txn.commit().unwrap();

        let mut txn = store.begin_write();
        let send_b = signed_send(&alice, alice_open_hash, carol.account, 200);
        let result = process(&mut txn, &send_b, &AlwaysValidPow);
        assert_eq!(
            result,
            ProcessResult::Fork {
                existing: send_a.hash()
            }
        );
    }

    #[test]
    fn receive_without_matching_pending_is_unreceivable() {
        let store = Store::open_temporary().unwrap();
        let bob = KeyPair::generate();
        let bob_open_source = BlockHash([0xee; 32]);

        let mut genesis_txn = store.begin_write();
        // Bob has no matching pending entry for this source hash.
        genesis_txn.put_account(
            bob.account,
            rai_store::AccountRecord {
                frontier: BlockHash([1; 32]),
                open: BlockHash([1; 32]),
                balance: 0,
                modified_timestamp: 0,
                representative: bob.account,
            },
        );
        genesis_txn.put_frontier(BlockHash([1; 32]), bob.account);
        genesis_txn.commit().unwrap();

        let mut txn = store.begin_write();
        let receive = signed_receive(&bob, BlockHash([1; 32]), bob_open_source);
        assert_eq!(
            process(&mut txn, &receive, &AlwaysValidPow),
            ProcessResult::Unreceivable
        );
    }

    #[test]
    fn send_with_previous_unknown_reports_gap_previous() {
        let store = Store::open_temporary().unwrap();
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let mut txn = store.begin_write();
        let dangling_previous = BlockHash([0x42; 32]);
        let send = signed_send(&alice, dangling_previous, bob.account, 0);
        assert_eq!(
            process(&mut txn, &send, &AlwaysValidPow),
            ProcessResult::GapPrevious
        );
    }

    #[test]
    fn change_block_moves_weight_between_representatives() {
        let store = Store::open_temporary().unwrap();
        let alice = KeyPair::generate();
        let rep_one = KeyPair::generate();
        let rep_two = KeyPair::generate();

        // seed_genesis opens under alice as her own representative.
        let alice_open_hash = seed_genesis(&store, &alice, 1_000);
        {
            let mut txn = store.begin_write();
            txn.put_account(
                alice.account,
                rai_store::AccountRecord {
                    frontier: alice_open_hash,
                    open: alice_open_hash,
                    balance: 1_000,
                    modified_timestamp: 0,
                    representative: rep_one.account,
                },
            );
            txn.add_weight(rep_one.account, 1_000);
            txn.commit().unwrap();
        }

        let mut txn = store.begin_write();
        let change = signed_change(&alice, alice_open_hash, rep_two.account);
        assert_eq!(
            process(&mut txn, &change, &AlwaysValidPow),
            ProcessResult::Progress
        );
        txn.commit().unwrap();

        let read = store.begin_read();
        assert_eq!(read.get_weight(rep_one.account), 0);
        assert_eq!(read.get_weight(rep_two.account), 1_000);
    }

    #[test]
    fn preferred_for_rebroadcast_picks_greater_difficulty_and_never_touches_tallies() {
        struct WorkIsDifficulty;
        impl ProofOfWork for WorkIsDifficulty {
            fn verify(&self, _root: rai_crypto::Root, _nonce: u64) -> bool {
                true
            }
            fn generate(&self, _root: rai_crypto::Root) -> u64 {
                0
            }
            fn difficulty(&self, _root: rai_crypto::Root, nonce: u64) -> u64 {
                nonce
            }
        }
        let root = rai_crypto::Root::from_slice(&[1; 32]).unwrap();
        let weak = Candidate {
            hash: BlockHash([1; 32]),
            root,
            work: 5,
        };
        let strong = Candidate {
            hash: BlockHash([2; 32]),
            root,
            work: 50,
        };
        assert_eq!(
            preferred_for_rebroadcast(&weak, &strong, &WorkIsDifficulty),
            strong.hash
        );
        assert_eq!(
            preferred_for_rebroadcast(&strong, &weak, &WorkIsDifficulty),
            strong.hash
        );
    }

    #[test]
    fn gap_cache_round_trips_a_send_block_pending_on_unknown_previous() {
        let mut cache = GapCache::new(16);
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let missing = BlockHash([9; 32]);
        let send = signed_send(&alice, missing, bob.account, 0);
        cache.insert(missing, send.clone());

        let released = cache.release(missing);
        assert_eq!(released, vec![send]);
        assert!(cache.release(missing).is_empty());
    }

    proptest::proptest! {
        // Whatever sequence of sends an account's chain is walked through,
        // its balance after the last one equals the opening balance minus
        // everything sent — a chain of valid `process()` calls can never
        // leak or invent units (spec §8's supply-conservation invariant).
        #[test]
        fn balance_is_conserved_across_an_arbitrary_chain_of_sends(
            fractions in proptest::collection::vec(0u8..=255, 1..12),
        ) {
            let store = Store::open_temporary().unwrap();
            let alice = KeyPair::generate();
            let initial: u128 = 1_000_000;
            let mut previous = seed_genesis(&store, &alice, initial);
            let mut remaining = initial;
            let mut total_sent: u128 = 0;

            for fraction in fractions {
                let amount = remaining * fraction as u128 / 255;
                let destination = KeyPair::generate();
                let mut txn = store.begin_write();
                let send = signed_send(&alice, previous, destination.account, remaining - amount);
                let result = process(&mut txn, &send, &AlwaysValidPow);
                proptest::prop_assert_eq!(result, ProcessResult::Progress);
                txn.commit().unwrap();
                previous = send.hash();
                remaining -= amount;
                total_sent += amount;
            }

            let read = store.begin_read();
            let account = read.get_account(alice.account).unwrap();
            proptest::prop_assert_eq!(account.balance, remaining);
            proptest::prop_assert_eq!(account.balance + total_sent, initial);
        }
    }
}
