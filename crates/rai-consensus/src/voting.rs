use crate::elections::ActiveElections;
use rai_crypto::{verify_signature, Account, BlockHash, Root, Signature};
use rai_store::Store;
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("store error: {0}")]
    Store(#[from] rai_store::StoreError),
}

/// A representative's ballot for one root's election (spec §4.F).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub representative: Account,
    pub sequence: u64,
    pub block_hash: BlockHash,
    pub signature: Signature,
}

impl Vote {
    fn signing_bytes(root: Root, sequence: u64, block_hash: BlockHash) -> Vec<u8> {
        let mut buf = Vec::with_capacity(72);
        buf.extend_from_slice(root.as_bytes());
        buf.extend_from_slice(&sequence.to_be_bytes());
        buf.extend_from_slice(block_hash.as_bytes());
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Accepted, and this is the first time this (representative, sequence)
    /// was seen for this root — the caller should rebroadcast it.
    Rebroadcast,
    /// Accepted, but already rebroadcast once for this (representative, sequence).
    Accepted,
    BadSignature,
    StaleSequence,
    UnknownElection,
    UnknownCandidate,
}

/// Validates and tallies incoming votes against the active elections table.
/// Keeps a rebroadcast-once guarantee per root independent of `Election`'s
/// own strictly-increasing sequence bookkeeping, since a vote that the
/// election rejects as stale must never be rebroadcast either.
pub struct VoteProcessor {
    seen: HashMap<Root, HashSet<(Account, u64)>>,
}

impl Default for VoteProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteProcessor {
    pub fn new() -> Self {
        VoteProcessor {
            seen: HashMap::new(),
        }
    }

    pub fn process(
        &mut self,
        elections: &mut ActiveElections,
        root: Root,
        vote: &Vote,
        weight_of: impl Fn(Account) -> u128,
    ) -> VoteOutcome {
        let Some(election) = elections.get(root) else {
            return VoteOutcome::UnknownElection;
        };
        if !election.candidates.contains_key(&vote.block_hash) {
            return VoteOutcome::UnknownCandidate;
        }

        let message = Vote::signing_bytes(root, vote.sequence, vote.block_hash);
        if !verify_signature(&message, &vote.signature, &vote.representative) {
            return VoteOutcome::BadSignature;
        }

        let weight = weight_of(vote.representative);
        let accepted = elections.cast_vote(
            root,
            vote.representative,
            vote.sequence,
            vote.block_hash,
            weight,
        );
        if !accepted {
            return VoteOutcome::StaleSequence;
        }

        let key = (vote.representative, vote.sequence);
        if self.seen.entry(root).or_default().insert(key) {
            VoteOutcome::Rebroadcast
        } else {
            VoteOutcome::Accepted
        }
    }

    /// Drop bookkeeping for a root once its election has resolved.
    pub fn forget(&mut self, root: Root) {
        self.seen.remove(&root);
    }
}

/// Synthesizes and signs this node's own votes when it represents weight
/// in an election, using the external key-store contract (spec §6). The
/// sequence counter is persisted per representative account in the
/// store's `meta` table so it survives restarts (spec §4.F).
pub struct LocalVoter {
    pub representative: Account,
}

impl LocalVoter {
    pub fn new(representative: Account) -> Self {
        LocalVoter { representative }
    }

    /// Allocate the next sequence number and build the bytes a key store
    /// must sign to produce a valid vote for `block_hash` at `root`.
    pub fn prepare_vote(
        &self,
        store: &Store,
        root: Root,
        block_hash: BlockHash,
    ) -> Result<(u64, Vec<u8>), VotingError> {
        let sequence = store.next_local_vote_sequence(self.representative)?;
        Ok((sequence, Vote::signing_bytes(root, sequence, block_hash)))
    }

    pub fn finish_vote(&self, sequence: u64, block_hash: BlockHash, signature: Signature) -> Vote {
        Vote {
            representative: self.representative,
            sequence,
            block_hash,
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elections::ActiveElections;
    use rai_core::{Block, ChangeBlock};
    use rai_crypto::KeyPair;
    use std::time::Instant;

    fn h(b: u8) -> BlockHash {
        BlockHash([b; 32])
    }

    fn dummy_change(previous: u8, rep: u8) -> Block {
        Block::Change(ChangeBlock {
            previous: h(previous),
            representative: h(rep),
            signature: rai_crypto::Signature([0; 64]),
            work: 0,
        })
    }

    fn make_vote(kp: &KeyPair, root: Root, sequence: u64, block_hash: BlockHash) -> Vote {
        let message = Vote::signing_bytes(root, sequence, block_hash);
        let signature = kp.sign(&message);
        Vote {
            representative: kp.account,
            sequence,
            block_hash,
            signature,
        }
    }

    #[test]
    fn first_vote_for_a_sequence_triggers_rebroadcast_once() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(root, h(10), dummy_change(1, 2), h(11), dummy_change(1, 3), Instant::now());

        let rep = KeyPair::generate();
        let mut processor = VoteProcessor::new();
        let vote = make_vote(&rep, root, 1, h(11));

        let outcome = processor.process(&mut elections, root, &vote, |_| 100);
        assert_eq!(outcome, VoteOutcome::Rebroadcast);

        let outcome_again = processor.process(&mut elections, root, &vote, |_| 100);
        assert_eq!(outcome_again, VoteOutcome::StaleSequence);
    }

    #[test]
    fn tampered_vote_signature_is_rejected() {
        let mut elections = ActiveElections::new(10);
        let root = h(1);
        elections.on_fork(root, h(10), dummy_change(1, 2), h(11), dummy_change(1, 3), Instant::now());

        let rep = KeyPair::generate();
        let mut vote = make_vote(&rep, root, 1, h(11));
        vote.block_hash = h(10);

        let mut processor = VoteProcessor::new();
        let outcome = processor.process(&mut elections, root, &vote, |_| 100);
        assert_eq!(outcome, VoteOutcome::BadSignature);
    }

    #[test]
    fn vote_for_unknown_election_is_reported() {
        let mut elections = ActiveElections::new(10);
        let rep = KeyPair::generate();
        let vote = make_vote(&rep, h(99), 1, h(11));
        let mut processor = VoteProcessor::new();
        let outcome = processor.process(&mut elections, h(99), &vote, |_| 100);
        assert_eq!(outcome, VoteOutcome::UnknownElection);
    }

    #[test]
    fn local_voter_sequence_numbers_are_persisted_and_increasing() {
        let store = Store::open_temporary().unwrap();
        let rep = KeyPair::generate();
        let voter = LocalVoter::new(rep.account);

        let (seq1, _) = voter.prepare_vote(&store, h(1), h(11)).unwrap();
        let (seq2, _) = voter.prepare_vote(&store, h(1), h(12)).unwrap();
        assert!(seq2 > seq1);
    }
}
