use crate::error::StoreError;
use crate::store::Trees;
use crate::types::{pending_key, AccountRecord, PendingRecord, StoredBlock};
use rai_core::Block;
use rai_crypto::{Account, BlockHash};
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A read-only view of the store, as of the moment each accessor is
/// called (sled's own MVCC gives a consistent snapshot per read).
pub struct ReadTxn {
    pub(crate) trees: Arc<Trees>,
}

impl ReadTxn {
    pub fn get_block(&self, hash: BlockHash) -> Option<StoredBlock> {
        self.trees
            .blocks
            .get(hash.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| StoredBlock::from_bytes(&v))
    }

    pub fn block_exists(&self, hash: BlockHash) -> bool {
        self.trees.blocks.contains_key(hash.as_bytes()).unwrap_or(false)
    }

    pub fn get_account(&self, account: Account) -> Option<AccountRecord> {
        self.trees
            .accounts
            .get(account.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| bincode::deserialize(&v).ok())
    }

    pub fn get_pending(&self, destination: Account, source: BlockHash) -> Option<PendingRecord> {
        let key = pending_key(destination, source);
        self.trees
            .pending
            .get(key)
            .ok()
            .flatten()
            .and_then(|v| bincode::deserialize(&v).ok())
    }

    pub fn get_weight(&self, representative: Account) -> u128 {
        self.trees
            .representation
            .get(representative.as_bytes())
            .ok()
            .flatten()
            .map(|v| u128::from_be_bytes(v.as_ref().try_into().unwrap_or([0; 16])))
            .unwrap_or(0)
    }

    /// Reverse index used by bootstrap: which account currently names
    /// `frontier` as its latest block.
    pub fn frontier_account(&self, frontier: BlockHash) -> Option<Account> {
        self.trees
            .frontiers
            .get(frontier.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| Account::from_slice(&v).ok())
    }

    pub fn get_unchecked(&self, missing: BlockHash) -> Vec<Block> {
        self.trees
            .unchecked
            .scan_prefix(missing.as_bytes())
            .values()
            .filter_map(|v| v.ok().and_then(|b| Block::from_bytes(&b).ok()))
            .collect()
    }

    /// True if `missing` has no dependent blocks parked on it. Used by
    /// callers that want to distinguish "nothing to release" from
    /// "already released" for the gap cache's idempotence property.
    pub fn has_unchecked(&self, missing: BlockHash) -> bool {
        self.trees
            .unchecked
            .scan_prefix(missing.as_bytes())
            .next()
            .is_some()
    }

    /// Deterministic iteration over every account in key order.
    pub fn iter_accounts(&self) -> impl Iterator<Item = (Account, AccountRecord)> + '_ {
        self.trees.accounts.iter().filter_map(|entry| {
            let (k, v) = entry.ok()?;
            let account = Account::from_slice(&k).ok()?;
            let record: AccountRecord = bincode::deserialize(&v).ok()?;
            Some((account, record))
        })
    }

    pub fn iter_pending(&self) -> impl Iterator<Item = PendingRecord> + '_ {
        self.trees
            .pending
            .iter()
            .filter_map(|entry| entry.ok().and_then(|(_, v)| bincode::deserialize(&v).ok()))
    }
}

/// An overlay of staged writes, applied atomically on `commit`. Reads
/// through the owning `WriteTxn` observe the overlay before falling
/// through to the committed trees, so a transaction sees its own writes.
#[derive(Default)]
struct Overlay {
    blocks: BTreeMap<BlockHash, Option<StoredBlock>>,
    accounts: BTreeMap<Account, Option<AccountRecord>>,
    pending: BTreeMap<Vec<u8>, Option<PendingRecord>>,
    representation: BTreeMap<Account, u128>,
    unchecked_put: Vec<(BlockHash, Block)>,
    unchecked_delete: Vec<BlockHash>,
    frontiers: BTreeMap<BlockHash, Option<Account>>,
}

/// A scoped write transaction (spec §4.B): on `commit` all writes become
/// visible atomically; dropped without `commit`, writes are discarded and
/// the single-writer guard is released.
pub struct WriteTxn {
    trees: Arc<Trees>,
    // An owned lock guard (parking_lot's `arc_lock` feature) — holds its
    // own `Arc<Mutex<()>>` clone, so the guard's lifetime isn't tied to a
    // borrow of `WriteTxn` itself. Released on drop, enforcing the
    // single-writer discipline of spec §4.B / §5.
    _guard: ArcMutexGuard<RawMutex, ()>,
    overlay: Overlay,
}

impl WriteTxn {
    pub(crate) fn new(trees: Arc<Trees>, guard_src: Arc<Mutex<()>>) -> WriteTxn {
        let guard = guard_src.lock_arc();
        WriteTxn {
            trees,
            _guard: guard,
            overlay: Overlay::default(),
        }
    }

    pub fn get_block(&self, hash: BlockHash) -> Option<StoredBlock> {
        if let Some(staged) = self.overlay.blocks.get(&hash) {
            return staged.clone();
        }
        self.trees
            .blocks
            .get(hash.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| StoredBlock::from_bytes(&v))
    }

    pub fn block_exists(&self, hash: BlockHash) -> bool {
        self.get_block(hash).is_some()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn put_block(
        &mut self,
        hash: BlockHash,
        block: Block,
        account: Account,
        height: u64,
        balance: u128,
        representative: Account,
    ) {
        self.overlay.blocks.insert(
            hash,
            Some(StoredBlock {
                block,
                account,
                height,
                balance,
                representative,
            }),
        );
    }

    pub fn get_account(&self, account: Account) -> Option<AccountRecord> {
        if let Some(staged) = self.overlay.accounts.get(&account) {
            return staged.clone();
        }
        self.trees
            .accounts
            .get(account.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| bincode::deserialize(&v).ok())
    }

    pub fn put_account(&mut self, account: Account, record: AccountRecord) {
        self.overlay.accounts.insert(account, Some(record));
    }

    pub fn get_pending(&self, destination: Account, source: BlockHash) -> Option<PendingRecord> {
        let key = pending_key(destination, source);
        if let Some(staged) = self.overlay.pending.get(&key) {
            return staged.clone();
        }
        self.trees
            .pending
            .get(key)
            .ok()
            .flatten()
            .and_then(|v| bincode::deserialize(&v).ok())
    }

    pub fn put_pending(&mut self, destination: Account, source: BlockHash, record: PendingRecord) {
        let key = pending_key(destination, source);
        self.overlay.pending.insert(key, Some(record));
    }

    pub fn delete_pending(&mut self, destination: Account, source: BlockHash) {
        let key = pending_key(destination, source);
        self.overlay.pending.insert(key, None);
    }

    pub fn get_weight(&self, representative: Account) -> u128 {
        if let Some(staged) = self.overlay.representation.get(&representative) {
            return *staged;
        }
        self.trees
            .representation
            .get(representative.as_bytes())
            .ok()
            .flatten()
            .map(|v| u128::from_be_bytes(v.as_ref().try_into().unwrap_or([0; 16])))
            .unwrap_or(0)
    }

    /// Credit `amount` to `representative`'s cumulative weight, saturating
    /// at `u128::MAX` rather than wrapping (genesis supply is `u128::MAX`,
    /// which an `i128` delta cannot represent without truncation).
    pub fn add_weight(&mut self, representative: Account, amount: u128) {
        let current = self.get_weight(representative);
        let updated = current.saturating_add(amount);
        self.overlay.representation.insert(representative, updated);
    }

    /// Debit `amount` from `representative`'s cumulative weight, saturating
    /// at zero.
    pub fn sub_weight(&mut self, representative: Account, amount: u128) {
        let current = self.get_weight(representative);
        let updated = current.saturating_sub(amount);
        self.overlay.representation.insert(representative, updated);
    }

    pub fn frontier_account(&self, frontier: BlockHash) -> Option<Account> {
        if let Some(staged) = self.overlay.frontiers.get(&frontier) {
            return *staged;
        }
        self.trees
            .frontiers
            .get(frontier.as_bytes())
            .ok()
            .flatten()
            .and_then(|v| Account::from_slice(&v).ok())
    }

    pub fn put_frontier(&mut self, frontier: BlockHash, account: Account) {
        self.overlay.frontiers.insert(frontier, Some(account));
    }

    pub fn clear_frontier(&mut self, frontier: BlockHash) {
        self.overlay.frontiers.insert(frontier, None);
    }

    pub fn put_unchecked(&mut self, missing: BlockHash, block: Block) {
        self.overlay.unchecked_put.push((missing, block));
    }

    pub fn delete_unchecked(&mut self, missing: BlockHash) {
        self.overlay.unchecked_delete.push(missing);
    }

    /// Remove a stored block entirely (used by rollback, §4.E).
    pub fn remove_block(&mut self, hash: BlockHash) {
        self.overlay.blocks.insert(hash, None);
    }

    pub fn remove_account(&mut self, account: Account) {
        self.overlay.accounts.insert(account, None);
    }

    /// Apply the staged overlay to all seven trees as one atomic unit.
    pub fn commit(self) -> Result<(), StoreError> {
        use sled::Transactional;

        // `TransactionalTree` (sled 0.34) exposes only get/insert/remove —
        // no `scan_prefix`/`iter` — so the keys a `delete_unchecked(missing)`
        // needs to remove have to be resolved against the plain `Tree`
        // before the transactional closure opens, not inside it. Combine
        // what's already durable with whatever this same overlay is about
        // to insert under that `missing` hash, so a put-then-delete of the
        // same dependent within one transaction still clears it.
        let mut unchecked_delete_keys: Vec<Vec<u8>> = Vec::new();
        for missing in &self.overlay.unchecked_delete {
            for kv in self.trees.unchecked.scan_prefix(missing.as_bytes()) {
                let (key, _) = kv?;
                unchecked_delete_keys.push(key.to_vec());
            }
            for (put_missing, block) in &self.overlay.unchecked_put {
                if put_missing == missing {
                    let mut key = missing.as_bytes().to_vec();
                    key.extend_from_slice(block.hash().as_bytes());
                    unchecked_delete_keys.push(key);
                }
            }
        }

        let trees = &self.trees;
        let result = (
            &trees.blocks,
            &trees.accounts,
            &trees.pending,
            &trees.representation,
            &trees.unchecked,
            &trees.frontiers,
        )
            .transaction(
                |(tx_blocks, tx_accounts, tx_pending, tx_representation, tx_unchecked, tx_frontiers)| {
                    for (hash, maybe_block) in &self.overlay.blocks {
                        match maybe_block {
                            Some(stored) => {
                                tx_blocks.insert(hash.as_bytes().as_ref(), stored.to_bytes())?;
                            }
                            None => {
                                tx_blocks.remove(hash.as_bytes().as_ref())?;
                            }
                        }
                    }
                    for (account, maybe_record) in &self.overlay.accounts {
                        match maybe_record {
                            Some(record) => {
                                let bytes = bincode::serialize(record)
                                    .expect("AccountRecord always serializes");
                                tx_accounts.insert(account.as_bytes().as_ref(), bytes)?;
                            }
                            None => {
                                tx_accounts.remove(account.as_bytes().as_ref())?;
                            }
                        }
                    }
                    for (key, maybe_record) in &self.overlay.pending {
                        match maybe_record {
                            Some(record) => {
                                let bytes = bincode::serialize(record)
                                    .expect("PendingRecord always serializes");
                                tx_pending.insert(key.as_slice(), bytes)?;
                            }
                            None => {
                                tx_pending.remove(key.as_slice())?;
                            }
                        }
                    }
                    for (account, weight) in &self.overlay.representation {
                        tx_representation
                            .insert(account.as_bytes().as_ref(), &weight.to_be_bytes())?;
                    }
                    for (missing, block) in &self.overlay.unchecked_put {
                        let mut key = missing.as_bytes().to_vec();
                        key.extend_from_slice(block.hash().as_bytes());
                        tx_unchecked.insert(key, block.to_bytes())?;
                    }
                    for key in &unchecked_delete_keys {
                        tx_unchecked.remove(key.as_slice())?;
                    }
                    for (frontier, maybe_account) in &self.overlay.frontiers {
                        match maybe_account {
                            Some(account) => {
                                tx_frontiers
                                    .insert(frontier.as_bytes().as_ref(), account.as_bytes().as_ref())?;
                            }
                            None => {
                                tx_frontiers.remove(frontier.as_bytes().as_ref())?;
                            }
                        }
                    }
                    Ok(())
                },
            );

        result.map_err(|e: sled::transaction::TransactionError<StoreError>| {
            StoreError::Commit(format!("{:?}", e))
        })?;

        drop(self._guard);
        Ok(())
    }
}
