// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-STORE
//
// Durable, transactional key-value view over the ledger: accounts,
// blocks, pending receives, representative weights, and frontier
// pointers (spec §4.B). Built on sled, generalizing the teacher's
// per-table method sled wrapper into a proper scoped transaction.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod error;
mod store;
mod txn;
mod types;

pub use error::StoreError;
pub use store::{Store, CURRENT_CONFIG_VERSION};
pub use txn::{ReadTxn, WriteTxn};
pub use types::{pending_key, AccountRecord, PendingRecord, StoredBlock};
