// Orchestrator (spec §4.I): binds every other component and owns the
// process-wide node lifecycle. `Node::submit` is the single entry point
// used by both local generation and inbound `publish` — it runs the
// validator inside one write transaction and routes the result exactly
// per spec.md §4's data-flow paragraph: progress persists and fires
// observers, fork enlists active elections, a missing dependency parks in
// the gap cache.

use crate::executor::Executor;
use crate::observers::Observers;
use parking_lot::Mutex;
use rai_consensus::{ActiveElections, Resolution, Vote, VoteOutcome, VoteProcessor};
use rai_core::Block;
use rai_crypto::pow::ProofOfWork;
use rai_crypto::{BlockHash, Root};
use rai_ledger::{process, reorganize, ConfirmationGapCache, GapCache, ProcessResult};
use rai_store::{ReadTxn, Store, StoreError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Distinct process exit status the binary returns when a store failure
/// aborts a write transaction at the commit boundary (spec §7).
pub const EXIT_STORE_FAILURE: i32 = 17;

/// Process-wide node state (spec §4.I). Lock acquisition order when more
/// than one of `elections`/`gap_cache` is held at once: elections before
/// gap_cache, and neither is ever held across a `store.begin_write()` call
/// (spec §5: "never the reverse").
pub struct Node {
    store: Store,
    elections: Mutex<ActiveElections>,
    gap_cache: Mutex<GapCache>,
    confirmation_gap_cache: Mutex<ConfirmationGapCache<String>>,
    vote_processor: Mutex<VoteProcessor>,
    observers: Observers,
    executor: Executor,
    pow: Arc<dyn ProofOfWork>,
    shutting_down: AtomicBool,
    pub warmed_up: AtomicU64,
}

impl Node {
    /// Opens (or creates) the store, seeds the genesis open block if the
    /// store is empty, and wires the in-flight bookkeeping structures.
    /// `observers` must already hold every sink the caller wants fired;
    /// registration is append-only and happens before this returns.
    pub fn new(
        config: &crate::config::NodeConfig,
        genesis: Block,
        pow: Arc<dyn ProofOfWork>,
        observers: Observers,
    ) -> Result<Node, NodeError> {
        let store = Store::open(&config.data_path)?;
        seed_genesis_if_absent(&store, &genesis, &pow);

        Ok(Node {
            store,
            elections: Mutex::new(ActiveElections::new(config.max_active_elections)),
            gap_cache: Mutex::new(GapCache::new(config.bounded_backlog)),
            confirmation_gap_cache: Mutex::new(ConfirmationGapCache::new(
                config.bootstrap_trigger_peers,
            )),
            vote_processor: Mutex::new(VoteProcessor::new()),
            observers,
            executor: Executor::new(config.io_threads),
            pow,
            shutting_down: AtomicBool::new(false),
            warmed_up: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn elections(&self) -> &Mutex<ActiveElections> {
        &self.elections
    }

    pub fn confirmation_gap_cache(&self) -> &Mutex<ConfirmationGapCache<String>> {
        &self.confirmation_gap_cache
    }

    /// The single entry point for both locally generated and inbound
    /// `publish` blocks (spec §4 data-flow paragraph).
    pub fn submit(&self, block: Block) -> ProcessResult {
        if self.shutting_down.load(Ordering::SeqCst) {
            log::warn!("submit called after shutdown; ignoring");
            return ProcessResult::Old;
        }
        self.submit_inner(block)
    }

    fn submit_inner(&self, block: Block) -> ProcessResult {
        let mut txn = self.store.begin_write();
        let result = process(&mut txn, &block, self.pow.as_ref());

        match &result {
            ProcessResult::Progress => {
                let hash = block.hash();
                txn.commit().expect("ledger store commit");
                self.dispatch_block_observer(hash);
                self.release_dependents(hash);
            }
            ProcessResult::Old => {
                log::debug!("block {:?} already processed", block.hash());
            }
            ProcessResult::Fork { existing } => {
                let incumbent = txn
                    .get_block(*existing)
                    .map(|s| s.block)
                    .unwrap_or_else(|| block.clone());
                drop(txn);
                let root = block.root();
                let challenger_hash = block.hash();
                let mut elections = self.elections.lock();
                elections.on_fork(
                    root,
                    *existing,
                    incumbent,
                    challenger_hash,
                    block,
                    Instant::now(),
                );
            }
            ProcessResult::GapPrevious | ProcessResult::GapSource => {
                drop(txn);
                if let Some(missing) = missing_dependency(&block, &result) {
                    self.gap_cache.lock().insert(missing, block);
                }
            }
            rejection => {
                log::info!("rejected block {:?}: {:?}", block.hash(), rejection);
            }
        }

        result
    }

    /// Validate and tally an inbound `confirm_ack` (spec §4.F) against the
    /// active election at `root`, weighing the representative's ballot by
    /// its currently stored voting weight. Fires the vote observer exactly
    /// once per accepted ballot, whether or not this is the first sighting
    /// that earns a rebroadcast.
    pub fn submit_vote(&self, root: Root, vote: &Vote) -> VoteOutcome {
        let outcome = {
            let mut elections = self.elections.lock();
            let mut processor = self.vote_processor.lock();
            processor.process(&mut elections, root, vote, |rep| {
                self.store.begin_read().get_weight(rep)
            })
        };
        if matches!(outcome, VoteOutcome::Rebroadcast | VoteOutcome::Accepted) {
            self.observers.fire_vote(vote);
        }
        outcome
    }

    /// Release and reprocess everything parked under `hash`, recursively —
    /// a released block may itself unblock further dependents (spec §4.D).
    fn release_dependents(&self, hash: BlockHash) {
        let released = self.gap_cache.lock().release(hash);
        for dependent in released {
            self.submit_inner(dependent);
        }
    }

    fn dispatch_block_observer(&self, hash: BlockHash) {
        let read = self.store.begin_read();
        let Some(stored) = read.get_block(hash) else {
            return;
        };
        // Coherence contract (spec §4.H, tested directly): by the time this
        // runs, a fresh read transaction already reports `block_exists`.
        debug_assert!(read.block_exists(hash));
        let amount = observed_amount(&read, &stored);
        let account = stored.account;
        let balance = stored.balance;
        self.observers.fire_block(&stored.block, account, amount);
        self.observers.fire_balance_change(account, balance);
    }

    /// Sweep active elections, applying confirmations/expirations against
    /// the store. Intended to be driven by an external timer (spec §5
    /// "suspension points ... scheduling a timer"); exposed here as a
    /// plain method so the caller controls the cadence.
    pub fn tick_elections(&self, total_weight: u128) {
        let resolutions = {
            let mut elections = self.elections.lock();
            elections.tick(Instant::now(), total_weight)
        };

        for resolution in resolutions {
            match resolution {
                Resolution::Confirmed { root, winner, .. } => {
                    self.apply_confirmation(root, winner);
                }
                Resolution::Expired { root } => {
                    log::info!("election at root {:?} expired without quorum", root);
                }
            }
            let root = match resolution_root(&resolution) {
                Some(r) => r,
                None => continue,
            };
            self.elections.lock().remove(root);
            self.vote_processor.lock().forget(root);
        }
    }

    /// Exactly one candidate at a root is ever actually stored before an
    /// election resolves — the incumbent block that occupied the root when
    /// the challenger arrived (spec §4.C step 8: the challenger is routed
    /// to `Fork` before any mutation, so it's never persisted until it
    /// wins). Find that one so the rollback contract (spec §4.E) knows
    /// whether there's anything to undo.
    fn current_head(&self, root: rai_crypto::Root) -> Option<BlockHash> {
        let read = self.store.begin_read();
        let elections = self.elections.lock();
        let election = elections.get(root)?;
        election
            .candidates
            .keys()
            .find(|hash| read.block_exists(**hash))
            .copied()
    }

    fn apply_confirmation(&self, root: rai_crypto::Root, winner: BlockHash) {
        // Resolve everything the election table can tell us — the current
        // head and the winning candidate's block — before ever touching
        // `store.begin_write()`. `elections` is never locked once a write
        // transaction is open (spec §5: "never the reverse").
        let current_head = self.current_head(root);
        let winner_block = {
            let elections = self.elections.lock();
            elections
                .get(root)
                .and_then(|election| election.candidates.get(&winner).cloned())
        };
        let Some(winner_block) = winner_block else {
            return;
        };

        let mut txn = self.store.begin_write();
        let outcome = match current_head {
            Some(head) if head == winner => None,
            Some(head) => Some(reorganize(&mut txn, head, &winner_block, self.pow.as_ref())),
            None => Some(process(&mut txn, &winner_block, self.pow.as_ref())),
        };
        match outcome {
            // `None` means the winner was already the stored head — nothing
            // changed, so no balance-change observer fires (spec §7: only a
            // previously-unseen winner triggers one).
            None => {}
            Some(ProcessResult::Progress) => {
                txn.commit().expect("reorg commit");
                self.dispatch_block_observer(winner);
            }
            Some(other) => {
                log::error!("confirmation replay for root {:?} failed: {:?}", root, other);
            }
        }
    }

    /// Idempotent: a second call is a no-op. Drains in-flight elections
    /// (marked `Expired` without resolving), flushes queued observer
    /// dispatches, and flushes the store (spec §4.I).
    pub fn shutdown(&mut self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.elections.lock().expire_all();
        self.executor.shutdown();
        if let Err(e) = self.store.flush() {
            log::error!("store flush failed during shutdown: {}", e);
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn resolution_root(resolution: &Resolution) -> Option<rai_crypto::Root> {
    match resolution {
        Resolution::Confirmed { root, .. } => Some(*root),
        Resolution::Expired { root } => Some(*root),
    }
}

fn missing_dependency(block: &Block, result: &ProcessResult) -> Option<BlockHash> {
    match result {
        ProcessResult::GapPrevious => block.previous(),
        ProcessResult::GapSource => block.source(),
        _ => None,
    }
}

/// Best-effort "amount" passed to the block observer: the balance delta
/// this block caused, or the full opening balance for `open`, or zero for
/// `change` (spec §4.H: "fired with block, account, amount").
fn observed_amount(read: &ReadTxn, stored: &rai_store::StoredBlock) -> u128 {
    match &stored.block {
        Block::Open(_) => stored.balance,
        Block::Change(_) => 0,
        Block::Send(send) => read
            .get_block(send.previous)
            .map(|prev| prev.balance.saturating_sub(stored.balance))
            .unwrap_or(0),
        Block::Receive(recv) => read
            .get_block(recv.previous)
            .map(|prev| stored.balance.saturating_sub(prev.balance))
            .unwrap_or(0),
    }
}

/// Seed the genesis account directly if the store doesn't already have an
/// open block for it. Idempotent across restarts against the same data
/// directory.
fn seed_genesis_if_absent(store: &Store, genesis: &Block, pow: &Arc<dyn ProofOfWork>) {
    let account = match genesis.account_hint() {
        Some(account) => account,
        None => {
            log::error!("genesis block is not an open block; refusing to seed");
            return;
        }
    };
    if store.begin_read().get_account(account).is_some() {
        return;
    }
    let mut txn = store.begin_write();
    match process(&mut txn, genesis, pow.as_ref()) {
        ProcessResult::Progress => {
            txn.commit().expect("genesis commit");
        }
        other => {
            log::error!("failed to seed genesis block: {:?}", other);
        }
    }
}
