use crate::error::StoreError;
use crate::txn::{ReadTxn, WriteTxn};
use parking_lot::Mutex;
use rai_crypto::Account;
use std::path::Path;
use std::sync::Arc;

pub(crate) const TREE_BLOCKS: &str = "blocks";
pub(crate) const TREE_ACCOUNTS: &str = "accounts";
pub(crate) const TREE_PENDING: &str = "pending";
pub(crate) const TREE_REPRESENTATION: &str = "representation";
pub(crate) const TREE_UNCHECKED: &str = "unchecked";
pub(crate) const TREE_FRONTIERS: &str = "frontiers";
pub(crate) const TREE_META: &str = "meta";

const META_CONFIG_VERSION: &[u8] = b"config_version";
/// Current config schema version. Bump alongside a new entry in
/// `migrate_config`; every migration must stay idempotent.
pub const CURRENT_CONFIG_VERSION: u32 = 3;

pub(crate) struct Trees {
    pub blocks: sled::Tree,
    pub accounts: sled::Tree,
    pub pending: sled::Tree,
    pub representation: sled::Tree,
    pub unchecked: sled::Tree,
    pub frontiers: sled::Tree,
    pub meta: sled::Tree,
}

/// Durable, transactional key-value view over the ledger (spec §4.B).
/// Many concurrent readers, at most one writer at a time — enforced by
/// `write_guard`.
pub struct Store {
    pub(crate) db: sled::Db,
    pub(crate) trees: Arc<Trees>,
    pub(crate) write_guard: Arc<Mutex<()>>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store, StoreError> {
        let db = sled::open(path)?;
        let trees = Trees {
            blocks: db.open_tree(TREE_BLOCKS)?,
            accounts: db.open_tree(TREE_ACCOUNTS)?,
            pending: db.open_tree(TREE_PENDING)?,
            representation: db.open_tree(TREE_REPRESENTATION)?,
            unchecked: db.open_tree(TREE_UNCHECKED)?,
            frontiers: db.open_tree(TREE_FRONTIERS)?,
            meta: db.open_tree(TREE_META)?,
        };

        let store = Store {
            db,
            trees: Arc::new(trees),
            write_guard: Arc::new(Mutex::new(())),
        };
        store.migrate_config()?;
        Ok(store)
    }

    /// Open an ephemeral, non-persistent store — used by tests.
    pub fn open_temporary() -> Result<Store, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        let trees = Trees {
            blocks: db.open_tree(TREE_BLOCKS)?,
            accounts: db.open_tree(TREE_ACCOUNTS)?,
            pending: db.open_tree(TREE_PENDING)?,
            representation: db.open_tree(TREE_REPRESENTATION)?,
            unchecked: db.open_tree(TREE_UNCHECKED)?,
            frontiers: db.open_tree(TREE_FRONTIERS)?,
            meta: db.open_tree(TREE_META)?,
        };
        let store = Store {
            db,
            trees: Arc::new(trees),
            write_guard: Arc::new(Mutex::new(())),
        };
        store.migrate_config()?;
        Ok(store)
    }

    /// Run the versioned config migration chain 1 -> 2 -> ... -> current.
    /// Each step is idempotent; an on-disk version newer than this build
    /// knows about is a hard error (Design Note: "Exceptions in config
    /// upgrade" become a typed error here, not a panic).
    fn migrate_config(&self) -> Result<(), StoreError> {
        let stored = self
            .trees
            .meta
            .get(META_CONFIG_VERSION)?
            .map(|v| {
                let arr: [u8; 4] = v.as_ref().try_into().unwrap_or([0; 4]);
                u32::from_be_bytes(arr)
            })
            .unwrap_or(0);

        if stored > CURRENT_CONFIG_VERSION {
            return Err(StoreError::UnknownConfigVersion(stored));
        }

        let mut version = stored;
        if version == 0 {
            // 0 -> 1: baseline schema, nothing to migrate, just stamp it.
            version = 1;
        }
        if version == 1 {
            // 1 -> 2: introduced the `frontiers` reverse-lookup tree used
            // by bootstrap; tree already created unconditionally above,
            // so this step is a no-op beyond the version bump.
            version = 2;
        }
        if version == 2 {
            // 2 -> 3: introduced the confirmation gap cache's persisted
            // peer-interest counters; no on-disk data predates this, so
            // there is nothing to backfill.
            version = 3;
        }

        if version != stored {
            self.trees
                .meta
                .insert(META_CONFIG_VERSION, &version.to_be_bytes())?;
        }
        Ok(())
    }

    pub fn begin_read(&self) -> ReadTxn {
        ReadTxn {
            trees: self.trees.clone(),
        }
    }

    /// Acquire the single-writer guard for the lifetime of the returned
    /// transaction. Blocks if another write transaction is in flight.
    pub fn begin_write(&self) -> WriteTxn {
        WriteTxn::new(self.trees.clone(), self.write_guard.clone())
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Allocate the next monotonic local-vote sequence number for
    /// `representative`, persisted in the `meta` table so it survives
    /// restarts (spec §4.F: "Local votes use a monotonic sequence number
    /// persisted per representative account").
    pub fn next_local_vote_sequence(&self, representative: Account) -> Result<u64, StoreError> {
        let key = local_vote_seq_key(representative);
        let mut next = 1u64;
        self.trees
            .meta
            .fetch_and_update(&key, |old| {
                let current = old
                    .map(|b| u64::from_be_bytes(b.try_into().unwrap_or([0; 8])))
                    .unwrap_or(0);
                next = current + 1;
                Some(next.to_be_bytes().to_vec())
            })?;
        Ok(next)
    }
}

fn local_vote_seq_key(representative: Account) -> Vec<u8> {
    let mut key = b"local_vote_seq:".to_vec();
    key.extend_from_slice(representative.as_bytes());
    key
}
