// Bootstrap reconciler (spec §4.G): pulls missing chains from peers and
// reorganises local state when a heavier fork is discovered. The
// frontier/bulk-pull exchange is a distinct protocol from the three core
// wire messages (spec §6) — it's modelled here as its own trait contract
// so a real implementation can speak whatever bootstrap wire format it
// likes; this crate only needs the shapes below.

use rai_consensus::ActiveElections;
use rai_core::Block;
use rai_crypto::pow::ProofOfWork;
use rai_crypto::{Account, BlockHash};
use rai_ledger::{process, ProcessResult};
use rai_store::Store;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("no peer available")]
    NoPeer,
    #[error("peer request failed: {0}")]
    PeerRequest(String),
}

/// Picks candidate peers for a bootstrap attempt. A real implementation
/// ranks by reciprocal `warmed_up` counters, recency, etc — out of scope
/// here; this crate only needs "give me one I haven't already tried".
pub trait PeerSource<E>: Send + Sync {
    fn pick(&self, exclude: &[E]) -> Option<E>;
}

/// The frontier/bulk-pull RPCs a bootstrap session drives against a picked
/// peer (spec §4.G). Kept separate from `network::WireMessage` because
/// these are request/response, not fire-and-forget.
pub trait BootstrapClient<E>: Send + Sync {
    fn frontiers(&self, peer: &E) -> Result<Vec<(Account, BlockHash)>, BootstrapError>;
    /// Pull every block for `account` from (but not including) `from` up
    /// to and including `to`, oldest first.
    fn bulk_pull(
        &self,
        peer: &E,
        account: Account,
        from: BlockHash,
        to: BlockHash,
    ) -> Result<Vec<Block>, BootstrapError>;
}

/// `100ms * 2^attempt`, capped — the exponential backoff spec §4.G and §7
/// require for bootstrap failures, always against a *different* peer, and
/// never allowed to mutate ledger state outside a successful `process`
/// call.
pub fn backoff_delay(attempt: u32, ceiling: Duration) -> Duration {
    let millis = 100u64.saturating_mul(1u64 << attempt.min(20));
    Duration::from_millis(millis).min(ceiling)
}

/// One divergent account discovered during a frontier diff, and the
/// outcome of pulling it.
#[derive(Debug)]
pub enum AccountOutcome {
    Applied { blocks: usize },
    ForkOpened { root: rai_crypto::Root },
    Failed(ProcessResult),
}

/// Runs a single bootstrap attempt against one peer: diff frontiers,
/// pull + replay each divergent account's missing range (spec §4.G).
pub struct BootstrapSession<'a, E> {
    store: &'a Store,
    elections: &'a mut ActiveElections,
    pow: &'a dyn ProofOfWork,
    client: &'a dyn BootstrapClient<E>,
}

impl<'a, E> BootstrapSession<'a, E> {
    pub fn new(
        store: &'a Store,
        elections: &'a mut ActiveElections,
        pow: &'a dyn ProofOfWork,
        client: &'a dyn BootstrapClient<E>,
    ) -> Self {
        BootstrapSession {
            store,
            elections,
            pow,
            client,
        }
    }

    /// Diff the peer's frontiers against the local ledger and replay the
    /// missing range for every divergent account.
    pub fn run(&mut self, peer: &E) -> Result<Vec<(Account, AccountOutcome)>, BootstrapError> {
        let peer_frontiers = self.client.frontiers(peer)?;
        let mut outcomes = Vec::new();

        for (account, peer_frontier) in peer_frontiers {
            let local_frontier = {
                let read = self.store.begin_read();
                read.get_account(account).map(|a| a.frontier)
            };
            if local_frontier == Some(peer_frontier) {
                continue; // already caught up on this account
            }
            let from = local_frontier.unwrap_or(rai_crypto::BlockHash::ZERO);
            let blocks = self.client.bulk_pull(peer, account, from, peer_frontier)?;
            outcomes.push((account, self.apply_pulled_chain(blocks)));
        }

        Ok(outcomes)
    }

    /// Replay a pulled chain through the validator, in order. A `Fork`
    /// opens an election instead of overwriting local state (spec §4.G,
    /// last paragraph); anything else stops the replay at the first
    /// non-`Progress` result without poisoning the ledger (spec §7).
    fn apply_pulled_chain(&mut self, blocks: Vec<Block>) -> AccountOutcome {
        let mut applied = 0;
        for block in blocks {
            let mut txn = self.store.begin_write();
            let result = process(&mut txn, &block, self.pow);
            match result {
                ProcessResult::Progress => {
                    txn.commit().expect("bootstrap commit");
                    applied += 1;
                }
                ProcessResult::Fork { existing } => {
                    let root = block.root();
                    let incumbent = txn
                        .get_block(existing)
                        .map(|s| s.block)
                        .unwrap_or_else(|| block.clone());
                    drop(txn);
                    self.elections.on_fork(
                        root,
                        existing,
                        incumbent,
                        block.hash(),
                        block,
                        Instant::now(),
                    );
                    return AccountOutcome::ForkOpened { root };
                }
                ProcessResult::Old => {
                    // already applied — keep replaying the rest of the chain
                    continue;
                }
                other => return AccountOutcome::Failed(other),
            }
        }
        AccountOutcome::Applied { blocks: applied }
    }
}
