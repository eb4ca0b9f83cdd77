use rai_core::Block;
use rai_crypto::BlockHash;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Holds blocks whose predecessor or source is missing; releases them
/// when the gap closes (spec §4.D). Bounded with LRU eviction.
pub struct GapCache {
    capacity: usize,
    dependents: BTreeMap<BlockHash, Vec<Block>>,
    recency: VecDeque<BlockHash>,
}

impl GapCache {
    pub fn new(capacity: usize) -> Self {
        GapCache {
            capacity,
            dependents: BTreeMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Park `dependent` under `missing`, evicting the oldest entry if the
    /// cache is at capacity.
    pub fn insert(&mut self, missing: BlockHash, dependent: Block) {
        if !self.dependents.contains_key(&missing) && self.dependents.len() >= self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.dependents.remove(&oldest);
            }
        }
        if !self.dependents.contains_key(&missing) {
            self.recency.push_back(missing);
        }
        self.dependents.entry(missing).or_default().push(dependent);
    }

    /// Release every block parked under `hash`. Idempotent: releasing a
    /// hash with nothing parked returns an empty vec, including a second
    /// call for a hash already released once.
    pub fn release(&mut self, hash: BlockHash) -> Vec<Block> {
        self.recency.retain(|h| *h != hash);
        self.dependents.remove(&hash).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }
}

/// Disjoint sub-structure recording unseen block hashes referenced by
/// incoming `confirm_req` messages, to surface "popular" unknown blocks
/// and trigger bootstrap (spec §4.D).
pub struct ConfirmationGapCache<P: Eq + std::hash::Hash + Clone> {
    bootstrap_trigger_peers: usize,
    interest: BTreeMap<BlockHash, HashSet<P>>,
}

impl<P: Eq + std::hash::Hash + Clone> ConfirmationGapCache<P> {
    pub fn new(bootstrap_trigger_peers: usize) -> Self {
        ConfirmationGapCache {
            bootstrap_trigger_peers,
            interest: BTreeMap::new(),
        }
    }

    /// Record that `peer` asked about unknown `hash`. Returns true the
    /// moment the distinct-peer count for this hash crosses the
    /// configured threshold, signalling the orchestrator to bootstrap.
    pub fn record(&mut self, hash: BlockHash, peer: P) -> bool {
        let peers = self.interest.entry(hash).or_default();
        let was_below = peers.len() < self.bootstrap_trigger_peers;
        peers.insert(peer);
        was_below && peers.len() >= self.bootstrap_trigger_peers
    }

    /// Clear interest in `hash`, typically once it's been fetched.
    pub fn clear(&mut self, hash: BlockHash) {
        self.interest.remove(&hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_core::{ChangeBlock, OpenBlock};
    use rai_crypto::{Account, Signature};

    fn h(b: u8) -> BlockHash {
        BlockHash([b; 32])
    }

    fn dummy_change(previous: u8) -> Block {
        Block::Change(ChangeBlock {
            previous: h(previous),
            representative: h(0),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    #[test]
    fn release_is_idempotent() {
        let mut cache = GapCache::new(10);
        cache.insert(h(1), dummy_change(1));
        let first = cache.release(h(1));
        assert_eq!(first.len(), 1);
        let second = cache.release(h(1));
        assert!(second.is_empty());
    }

    #[test]
    fn eviction_drops_oldest_entry_at_capacity() {
        let mut cache = GapCache::new(2);
        cache.insert(h(1), dummy_change(1));
        cache.insert(h(2), dummy_change(2));
        cache.insert(h(3), dummy_change(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.release(h(1)).is_empty());
        assert_eq!(cache.release(h(3)).len(), 1);
    }

    #[test]
    fn released_block_that_gaps_again_goes_back_under_new_hash() {
        let mut cache = GapCache::new(10);
        cache.insert(h(1), dummy_change(1));
        let released = cache.release(h(1));
        assert_eq!(released.len(), 1);
        // caller reprocesses, gets gap_previous on a different hash
        cache.insert(h(99), released.into_iter().next().unwrap());
        assert_eq!(cache.release(h(99)).len(), 1);
    }

    #[test]
    fn confirmation_gap_cache_triggers_once_threshold_crossed() {
        let mut cache: ConfirmationGapCache<u32> = ConfirmationGapCache::new(3);
        assert!(!cache.record(h(1), 1));
        assert!(!cache.record(h(1), 2));
        assert!(cache.record(h(1), 3));
        // further peers don't re-trigger
        assert!(!cache.record(h(1), 4));
    }

    #[test]
    fn open_block_kind_used_in_other_tests_compiles() {
        let _ = Block::Open(OpenBlock {
            source: h(1),
            representative: h(2),
            account: Account([3; 32]),
            signature: Signature([0; 64]),
            work: 0,
        });
    }
}
