use rai_core::Block;
use rai_crypto::{Account, BlockHash};
use serde::{Deserialize, Serialize};

/// `blocks` table value: the canonically-encoded block plus the sideband
/// (spec §4.B: "hash → encoded block + sideband"). The sideband is not
/// part of the signed/hashed content: it is everything about the block's
/// position and effect that isn't recoverable from its own wire encoding
/// alone — the owning account, its 1-based chain height, the account
/// balance immediately after this block, and the representative in
/// effect at that point. Mirrors the real ledger's practice of carrying
/// resulting balance in the sideband rather than only in account_info, so
/// a fork rollback can restore the account to its pre-block state from
/// the sideband of the block it is rolling back to, without replaying
/// the whole chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlock {
    pub block: Block,
    pub account: Account,
    pub height: u64,
    pub balance: u128,
    pub representative: Account,
}

impl StoredBlock {
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.block.to_bytes();
        out.extend_from_slice(self.account.as_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.balance.to_be_bytes());
        out.extend_from_slice(self.representative.as_bytes());
        out
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<StoredBlock> {
        const SIDEBAND_LEN: usize = 32 + 8 + 16 + 32;
        if bytes.len() < SIDEBAND_LEN {
            return None;
        }
        let split = bytes.len() - SIDEBAND_LEN;
        let block = Block::from_bytes(&bytes[..split]).ok()?;
        let account = Account::from_slice(&bytes[split..split + 32]).ok()?;
        let height = u64::from_be_bytes(bytes[split + 32..split + 40].try_into().ok()?);
        let balance = u128::from_be_bytes(bytes[split + 40..split + 56].try_into().ok()?);
        let representative = Account::from_slice(&bytes[split + 56..split + 88]).ok()?;
        Some(StoredBlock {
            block,
            account,
            height,
            balance,
            representative,
        })
    }
}

/// `accounts` table value: {frontier, open, balance, modified_timestamp, representative}.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub frontier: BlockHash,
    pub open: BlockHash,
    pub balance: u128,
    pub modified_timestamp: u64,
    pub representative: Account,
}

/// `pending` table value, keyed by destination account ‖ source block hash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRecord {
    pub sender: Account,
    pub amount: u128,
}

/// The composite key for the `pending` table.
pub fn pending_key(destination: Account, source: BlockHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(64);
    key.extend_from_slice(destination.as_bytes());
    key.extend_from_slice(source.as_bytes());
    key
}
