use rai_core::Block;
use rai_crypto::pow::ProofOfWork;
use rai_crypto::{Account, BlockHash, Root};
use rai_ledger::reorganize;
use rai_store::WriteTxn;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Numerator/denominator of the supermajority fraction of online weight a
/// candidate needs to confirm (spec.md Open Question (a), resolved here as
/// a named constant rather than left implicit). Configurable via
/// `quorum_numerator`/`quorum_denominator` in `NodeConfig`.
pub const SUPERMAJORITY_NUMERATOR: u128 = 1;
pub const SUPERMAJORITY_DENOMINATOR: u128 = 2;

/// How long an election stays open with no quorum before it's abandoned.
pub const ELECTION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionState {
    Open,
    Confirmed(BlockHash),
    Expired,
}

/// One root's fork contest: every candidate block seen at that root and
/// the tallied representative weight currently behind each.
pub struct Election {
    pub root: Root,
    pub candidates: BTreeMap<BlockHash, Block>,
    pub tallies: BTreeMap<BlockHash, u128>,
    /// The candidate each representative is currently voting for — kept
    /// so a changed vote can have its old weight subtracted before the
    /// new weight is added (never double-counts).
    votes: BTreeMap<Account, BlockHash>,
    /// Last accepted sequence number per representative, for the
    /// strictly-increasing check (spec §4.F).
    observed: BTreeMap<Account, u64>,
    pub started: Instant,
    pub state: ElectionState,
}

impl Election {
    fn new(root: Root, incumbent_hash: BlockHash, incumbent: Block, started: Instant) -> Self {
        let mut candidates = BTreeMap::new();
        candidates.insert(incumbent_hash, incumbent);
        let mut tallies = BTreeMap::new();
        tallies.insert(incumbent_hash, 0);
        Election {
            root,
            candidates,
            tallies,
            votes: BTreeMap::new(),
            observed: BTreeMap::new(),
            started,
            state: ElectionState::Open,
        }
    }

    fn add_candidate(&mut self, hash: BlockHash, block: Block) {
        self.candidates.entry(hash).or_insert(block);
        self.tallies.entry(hash).or_insert(0);
    }

    /// Record `representative`'s vote for `candidate` with `weight`
    /// behind it, honouring the strictly-increasing sequence rule and
    /// moving any previous weight the representative had cast elsewhere
    /// in this election.
    fn cast_vote(
        &mut self,
        representative: Account,
        sequence: u64,
        candidate: BlockHash,
        weight: u128,
    ) -> bool {
        if let Some(&last) = self.observed.get(&representative) {
            if sequence <= last {
                return false;
            }
        }
        if !self.candidates.contains_key(&candidate) {
            return false;
        }
        self.observed.insert(representative, sequence);

        if let Some(previous) = self.votes.insert(representative, candidate) {
            if previous != candidate {
                if let Some(tally) = self.tallies.get_mut(&previous) {
                    *tally = tally.saturating_sub(weight);
                }
            }
        }
        *self.tallies.entry(candidate).or_insert(0) += weight;
        true
    }

    fn leading(&self) -> Option<(BlockHash, u128)> {
        self.tallies
            .iter()
            .max_by_key(|(_, weight)| **weight)
            .map(|(hash, weight)| (*hash, *weight))
    }
}

/// Outcome of a `tick` sweep for one root.
#[derive(Debug, Clone)]
pub enum Resolution {
    Confirmed {
        root: Root,
        winner: BlockHash,
        losers: Vec<BlockHash>,
    },
    Expired {
        root: Root,
    },
}

/// The table of forks currently under election (spec §4.E). Capped at
/// `max_active_elections`; beyond the cap, `on_fork` is a no-op, matching
/// the back-pressure policy of spec §5.
pub struct ActiveElections {
    elections: HashMap<Root, Election>,
    max_active_elections: usize,
}

impl ActiveElections {
    pub fn new(max_active_elections: usize) -> Self {
        ActiveElections {
            elections: HashMap::new(),
            max_active_elections,
        }
    }

    pub fn len(&self) -> usize {
        self.elections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elections.is_empty()
    }

    pub fn get(&self, root: Root) -> Option<&Election> {
        self.elections.get(&root)
    }

    /// Open (or extend) the election at `incumbent`'s root with a new
    /// challenger. Idempotent: a candidate hash already registered is a
    /// no-op. Returns `None` if the table is at capacity and this would
    /// be a brand new election.
    pub fn on_fork(
        &mut self,
        root: Root,
        incumbent_hash: BlockHash,
        incumbent: Block,
        challenger_hash: BlockHash,
        challenger: Block,
        started: Instant,
    ) -> Option<&mut Election> {
        if !self.elections.contains_key(&root) && self.elections.len() >= self.max_active_elections {
            return None;
        }
        let election = self
            .elections
            .entry(root)
            .or_insert_with(|| Election::new(root, incumbent_hash, incumbent, started));
        election.add_candidate(challenger_hash, challenger);
        Some(election)
    }

    pub fn cast_vote(
        &mut self,
        root: Root,
        representative: Account,
        sequence: u64,
        candidate: BlockHash,
        weight: u128,
    ) -> bool {
        match self.elections.get_mut(&root) {
            Some(election) => election.cast_vote(representative, sequence, candidate, weight),
            None => false,
        }
    }

    /// Sweep every open election: confirm the leader once it crosses the
    /// supermajority threshold of `total_weight`, else expire it once
    /// `ELECTION_TIMEOUT` has passed with no quorum.
    pub fn tick(&mut self, now: Instant, total_weight: u128) -> Vec<Resolution> {
        let threshold = total_weight * SUPERMAJORITY_NUMERATOR / SUPERMAJORITY_DENOMINATOR;
        let mut resolutions = Vec::new();

        for election in self.elections.values_mut() {
            if election.state != ElectionState::Open {
                continue;
            }
            if let Some((winner, weight)) = election.leading() {
                if weight >= threshold {
                    election.state = ElectionState::Confirmed(winner);
                    let losers = election
                        .candidates
                        .keys()
                        .filter(|h| **h != winner)
                        .copied()
                        .collect();
                    resolutions.push(Resolution::Confirmed {
                        root: election.root,
                        winner,
                        losers,
                    });
                    continue;
                }
            }
            if now.duration_since(election.started) >= ELECTION_TIMEOUT {
                election.state = ElectionState::Expired;
                resolutions.push(Resolution::Expired { root: election.root });
            }
        }

        resolutions
    }

    /// Apply a `Confirmed` resolution: if the chain currently holds a
    /// losing candidate as its head, roll it back and install the winner
    /// (spec §4.E rollback contract). `current_head` is whichever
    /// candidate is presently stored at this root, if any.
    pub fn apply_confirmation(
        &self,
        txn: &mut WriteTxn,
        root: Root,
        winner: BlockHash,
        current_head: Option<BlockHash>,
        pow: &dyn ProofOfWork,
    ) -> Option<rai_ledger::ProcessResult> {
        let election = self.elections.get(&root)?;
        let winner_block = election.candidates.get(&winner)?;

        match current_head {
            Some(head) if head == winner => None,
            Some(head) => Some(reorganize(txn, head, winner_block, pow)),
            None => Some(rai_ledger::process(txn, winner_block, pow)),
        }
    }

    /// Remove a resolved election from the table once the caller has
    /// finished acting on its resolution.
    pub fn remove(&mut self, root: Root) -> Option<Election> {
        self.elections.remove(&root)
    }

    /// Mark every open election `Expired` without resolving it, used by
    /// `Node::shutdown` to drain in-flight elections cleanly.
    pub fn expire_all(&mut self) {
        for election in self.elections.values_mut() {
            if election.state == ElectionState::Open {
                election.state = ElectionState::Expired;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_core::{ChangeBlock, OpenBlock};
    use rai_crypto::Signature;

    fn h(b: u8) -> BlockHash {
        BlockHash([b; 32])
    }

    fn dummy_change(previous: u8, rep: u8) -> Block {
        Block::Change(ChangeBlock {
            previous: h(previous),
            representative: h(rep),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    fn dummy_open(rep: u8, account: u8) -> Block {
        Block::Open(OpenBlock {
            source: h(1),
            representative: h(rep),
            account: h(account),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    #[test]
    fn on_fork_is_idempotent_for_the_same_candidate() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        let incumbent = dummy_change(1, 2);
        let challenger = dummy_change(1, 3);
        let now = Instant::now();

        elections.on_fork(root, h(10), incumbent.clone(), h(11), challenger.clone(), now);
        elections.on_fork(root, h(10), incumbent, h(11), challenger, now);

        assert_eq!(elections.get(root).unwrap().candidates.len(), 2);
    }

    #[test]
    fn supermajority_confirms_the_leading_candidate() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(
            root,
            h(10),
            dummy_change(1, 2),
            h(11),
            dummy_change(1, 3),
            Instant::now(),
        );

        elections.cast_vote(root, h(100), 1, h(11), 600);
        let resolutions = elections.tick(Instant::now(), 1_000);
        assert!(matches!(
            resolutions.as_slice(),
            [Resolution::Confirmed { winner, .. }] if *winner == h(11)
        ));
    }

    #[test]
    fn stale_sequence_vote_is_rejected() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(
            root,
            h(10),
            dummy_change(1, 2),
            h(11),
            dummy_change(1, 3),
            Instant::now(),
        );
        assert!(elections.cast_vote(root, h(100), 5, h(11), 100));
        assert!(!elections.cast_vote(root, h(100), 5, h(10), 100));
        assert!(!elections.cast_vote(root, h(100), 3, h(10), 100));
    }

    #[test]
    fn changed_vote_moves_weight_without_double_counting() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(
            root,
            h(10),
            dummy_open(2, 5),
            h(11),
            dummy_open(3, 5),
            Instant::now(),
        );
        elections.cast_vote(root, h(100), 1, h(10), 500);
        assert_eq!(elections.get(root).unwrap().tallies[&h(10)], 500);
        elections.cast_vote(root, h(100), 2, h(11), 500);
        assert_eq!(elections.get(root).unwrap().tallies[&h(10)], 0);
        assert_eq!(elections.get(root).unwrap().tallies[&h(11)], 500);
    }

    #[test]
    fn no_quorum_expires_after_timeout() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(
            root,
            h(10),
            dummy_change(1, 2),
            h(11),
            dummy_change(1, 3),
            Instant::now(),
        );
        elections.cast_vote(root, h(100), 1, h(10), 400);
        elections.cast_vote(root, h(101), 1, h(11), 400);

        let past_timeout = Instant::now() + ELECTION_TIMEOUT + Duration::from_secs(1);
        let resolutions = elections.tick(past_timeout, 1_000);
        assert!(matches!(resolutions.as_slice(), [Resolution::Expired { .. }]));
    }

    #[test]
    fn table_at_capacity_rejects_new_roots_but_extends_existing_ones() {
        let mut elections = ActiveElections::new(1);
        let root_a = h(1);
        let root_b = h(2);
        assert!(elections
            .on_fork(root_a, h(10), dummy_change(1, 2), h(11), dummy_change(1, 3), Instant::now())
            .is_some());
        assert!(elections
            .on_fork(root_b, h(20), dummy_change(2, 2), h(21), dummy_change(2, 3), Instant::now())
            .is_none());
        assert!(elections
            .on_fork(root_a, h(10), dummy_change(1, 2), h(12), dummy_change(1, 4), Instant::now())
            .is_some());
    }

    proptest::proptest! {
        // Regardless of how many times a fixed set of representatives
        // change their mind (as long as each cast carries a
        // strictly-increasing sequence number), the sum of tallies across
        // every candidate always equals the sum of weight behind whichever
        // candidate each representative voted for last — weight can move
        // between candidates but is never duplicated or dropped.
        #[test]
        fn repeated_vote_changes_never_duplicate_or_drop_weight(
            choices in proptest::collection::vec(0u8..=2, 1..30),
        ) {
            let mut elections = ActiveElections::new(10);
            let root = h(1);
            elections.on_fork(root, h(10), dummy_change(1, 2), h(11), dummy_change(1, 3), Instant::now());
            elections.on_fork(root, h(10), dummy_change(1, 2), h(12), dummy_change(1, 4), Instant::now());
            let candidates = [h(10), h(11), h(12)];
            let representatives = [h(100), h(101), h(102)];
            let weights = [300u128, 250, 150];

            let mut last_choice = [None; 3];
            for (sequence, choice) in choices.iter().enumerate() {
                let rep_index = (sequence) % representatives.len();
                let candidate = candidates[*choice as usize];
                elections.cast_vote(root, representatives[rep_index], sequence as u64 + 1, candidate, weights[rep_index]);
                last_choice[rep_index] = Some(candidate);
            }

            let expected_total: u128 = representatives
                .iter()
                .enumerate()
                .filter_map(|(i, _)| last_choice[i].map(|_| weights[i]))
                .sum();
            let actual_total: u128 = elections.get(root).unwrap().tallies.values().sum();
            proptest::prop_assert_eq!(actual_total, expected_total);
        }
    }
}
