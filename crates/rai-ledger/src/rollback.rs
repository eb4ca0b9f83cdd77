use crate::validator::{process, ProcessResult};
use rai_core::Block;
use rai_crypto::pow::ProofOfWork;
use rai_crypto::BlockHash;
use rai_store::{AccountRecord, PendingRecord, WriteTxn};

/// Undo a single committed block, restoring its owning account to the
/// state it was in immediately before the block was applied, using the
/// sideband of the block it points back to. Returns the removed block,
/// or `None` if `hash` isn't stored.
///
/// Only rolls back one block — the caller (an election resolving in
/// favour of a different candidate at the same root) only ever needs to
/// undo the single head block that lost the election, never a deeper
/// chain, since elections are opened per-root (spec §4.E) and a root can
/// only ever have one block sitting on top of it until the next one is
/// processed.
pub fn undo_head(txn: &mut WriteTxn, hash: BlockHash) -> Option<Block> {
    let stored = txn.get_block(hash)?;
    let current = txn.get_account(stored.account)?;

    match &stored.block {
        Block::Open(open) => {
            let sender = txn.get_block(open.source).map(|s| s.account)?;
            txn.remove_block(hash);
            txn.remove_account(stored.account);
            txn.clear_frontier(hash);
            txn.put_pending(
                stored.account,
                open.source,
                PendingRecord {
                    sender,
                    amount: stored.balance,
                },
            );
            txn.sub_weight(open.representative, stored.balance);
        }
        Block::Send(send) => {
            let prev = txn.get_block(send.previous)?;
            let amount_sent = prev.balance - stored.balance;
            txn.remove_block(hash);
            txn.delete_pending(send.destination, hash);
            txn.clear_frontier(hash);
            txn.put_frontier(send.previous, stored.account);
            txn.put_account(
                stored.account,
                AccountRecord {
                    frontier: send.previous,
                    balance: prev.balance,
                    representative: prev.representative,
                    ..current
                },
            );
            txn.add_weight(stored.representative, amount_sent);
        }
        Block::Receive(recv) => {
            let prev = txn.get_block(recv.previous)?;
            let source_sender = txn.get_block(recv.source).map(|s| s.account)?;
            let amount = stored.balance - prev.balance;
            txn.remove_block(hash);
            txn.put_pending(
                stored.account,
                recv.source,
                PendingRecord {
                    sender: source_sender,
                    amount,
                },
            );
            txn.clear_frontier(hash);
            txn.put_frontier(recv.previous, stored.account);
            txn.put_account(
                stored.account,
                AccountRecord {
                    frontier: recv.previous,
                    balance: prev.balance,
                    representative: prev.representative,
                    ..current
                },
            );
            txn.sub_weight(stored.representative, amount);
        }
        Block::Change(change) => {
            let prev = txn.get_block(change.previous)?;
            txn.remove_block(hash);
            txn.clear_frontier(hash);
            txn.put_frontier(change.previous, stored.account);
            txn.put_account(
                stored.account,
                AccountRecord {
                    frontier: change.previous,
                    balance: prev.balance,
                    representative: prev.representative,
                    ..current
                },
            );
            txn.sub_weight(change.representative, stored.balance);
            txn.add_weight(prev.representative, stored.balance);
        }
    }

    Some(stored.block)
}

/// Apply an election's outcome: undo the losing block at `losing_hash` and
/// install `winner` in its place (spec §4.E rollback contract). `winner`
/// is reprocessed through the ordinary validator, so it is held to the
/// exact same checks a freshly-published block would be.
pub fn reorganize(
    txn: &mut WriteTxn,
    losing_hash: BlockHash,
    winner: &Block,
    pow: &dyn ProofOfWork,
) -> ProcessResult {
    // Idempotent: undo_head no-ops (returns None) if losing_hash was
    // already rolled back by a previous call.
    let _ = undo_head(txn, losing_hash);
    process(txn, winner, pow)
}
