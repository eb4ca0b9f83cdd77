use rai_core::Block;
use rai_crypto::pow::ProofOfWork;
use rai_crypto::{verify_signature, Account, BlockHash, Root};
use rai_store::{AccountRecord, PendingRecord, WriteTxn};

/// Outcome of `process` (spec §4.C). Each variant is a plain data value —
/// rejections are expected outcomes, never exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    Progress,
    BadSignature,
    Old,
    NegativeSpend,
    Fork { existing: BlockHash },
    Unreceivable,
    GapPrevious,
    GapSource,
    NotReceiveFromSend,
    InsufficientWork,
}

impl ProcessResult {
    pub fn is_progress(&self) -> bool {
        matches!(self, ProcessResult::Progress)
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, ProcessResult::GapPrevious | ProcessResult::GapSource)
    }
}

/// Pure validator: given a write transaction and a block, determine
/// accept/reject and apply the resulting state delta (spec §4.C).
///
/// Decision order exactly matches spec.md: PoW, signature, duplicate,
/// then kind-specific checks, with any block landing at an occupied root
/// routed to `Fork` instead of being rejected outright.
pub fn process(txn: &mut WriteTxn, block: &Block, pow: &dyn ProofOfWork) -> ProcessResult {
    let root = block.root();

    // 1. Proof-of-work against the root.
    if !pow.verify(root, block.work()) {
        return ProcessResult::InsufficientWork;
    }

    // 2. Signature against the block's account. For open blocks the
    // account is carried directly; for others it is the account that
    // currently owns `previous` as its frontier or, failing that, any
    // block already on that chain (resolved via the stored sideband).
    let account = match resolve_account(txn, block) {
        Some(a) => a,
        // We can't resolve the signer yet because the predecessor itself
        // is unknown — that's a gap, not a signature failure.
        None => match block.previous() {
            Some(previous) if txn.get_block(previous).is_none() => {
                return ProcessResult::GapPrevious
            }
            _ => match block.source() {
                Some(source) if txn.get_block(source).is_none() => {
                    return ProcessResult::GapSource
                }
                _ => return ProcessResult::BadSignature,
            },
        },
    };

    if !verify_signature(&block.signing_hash().0, &block.signature(), &account) {
        return ProcessResult::BadSignature;
    }

    // 3. Duplicate check.
    let hash = block.hash();
    if txn.get_block(hash).is_some() {
        return ProcessResult::Old;
    }

    // 8 (checked early, applies uniformly): a different block already
    // occupies this root.
    if let Some(existing) = root_occupant(txn, block, account) {
        if existing != hash {
            return ProcessResult::Fork { existing };
        }
    }

    match block {
        Block::Send(send) => {
            let Some(prev) = txn.get_block(send.previous) else {
                return ProcessResult::GapPrevious;
            };
            let Some(acc) = txn.get_account(account) else {
                return ProcessResult::GapPrevious;
            };
            if acc.frontier != send.previous {
                return ProcessResult::Fork {
                    existing: acc.frontier,
                };
            }
            if send.balance_after_send > acc.balance {
                return ProcessResult::NegativeSpend;
            }
            let amount_sent = acc.balance - send.balance_after_send;

            txn.put_block(
                hash,
                block.clone(),
                account,
                prev.height + 1,
                send.balance_after_send,
                acc.representative,
            );
            txn.clear_frontier(acc.frontier);
            txn.put_frontier(hash, account);
            txn.put_account(
                account,
                AccountRecord {
                    frontier: hash,
                    balance: send.balance_after_send,
                    ..acc
                },
            );
            txn.put_pending(
                send.destination,
                hash,
                PendingRecord {
                    sender: account,
                    amount: amount_sent,
                },
            );
            txn.sub_weight(acc.representative, amount_sent);
            ProcessResult::Progress
        }
        Block::Receive(recv) => {
            let Some(prev) = txn.get_block(recv.previous) else {
                return ProcessResult::GapPrevious;
            };
            let Some(source_block) = txn.get_block(recv.source) else {
                return ProcessResult::GapSource;
            };
            if !matches!(source_block.block, Block::Send(_)) {
                return ProcessResult::NotReceiveFromSend;
            }
            let Some(acc) = txn.get_account(account) else {
                return ProcessResult::GapPrevious;
            };
            if acc.frontier != recv.previous {
                return ProcessResult::Fork {
                    existing: acc.frontier,
                };
            }
            let Some(pending) = txn.get_pending(account, recv.source) else {
                return ProcessResult::Unreceivable;
            };

            let new_balance = acc.balance + pending.amount;
            txn.put_block(
                hash,
                block.clone(),
                account,
                prev.height + 1,
                new_balance,
                acc.representative,
            );
            txn.delete_pending(account, recv.source);
            txn.clear_frontier(acc.frontier);
            txn.put_frontier(hash, account);
            txn.put_account(
                account,
                AccountRecord {
                    frontier: hash,
                    balance: new_balance,
                    ..acc
                },
            );
            txn.add_weight(acc.representative, pending.amount);
            ProcessResult::Progress
        }
        Block::Open(open) => {
            // An existing account for this root would already have been
            // caught by the root_occupant() fork check above.
            let Some(source_block) = txn.get_block(open.source) else {
                return ProcessResult::GapSource;
            };
            if !matches!(source_block.block, Block::Send(_)) {
                return ProcessResult::NotReceiveFromSend;
            }
            let Some(pending) = txn.get_pending(open.account, open.source) else {
                return ProcessResult::Unreceivable;
            };

            txn.put_block(
                hash,
                block.clone(),
                open.account,
                1,
                pending.amount,
                open.representative,
            );
            txn.delete_pending(open.account, open.source);
            txn.put_frontier(hash, open.account);
            txn.put_account(
                open.account,
                AccountRecord {
                    frontier: hash,
                    open: hash,
                    balance: pending.amount,
                    modified_timestamp: 0,
                    representative: open.representative,
                },
            );
            txn.add_weight(open.representative, pending.amount);
            ProcessResult::Progress
        }
        Block::Change(change) => {
            let Some(prev) = txn.get_block(change.previous) else {
                return ProcessResult::GapPrevious;
            };
            let Some(acc) = txn.get_account(account) else {
                return ProcessResult::GapPrevious;
            };
            if acc.frontier != change.previous {
                return ProcessResult::Fork {
                    existing: acc.frontier,
                };
            }

            txn.put_block(
                hash,
                block.clone(),
                account,
                prev.height + 1,
                acc.balance,
                change.representative,
            );
            txn.clear_frontier(acc.frontier);
            txn.put_frontier(hash, account);
            txn.sub_weight(acc.representative, acc.balance);
            txn.add_weight(change.representative, acc.balance);
            txn.put_account(
                account,
                AccountRecord {
                    frontier: hash,
                    representative: change.representative,
                    ..acc
                },
            );
            ProcessResult::Progress
        }
    }
}

/// Resolve the account a block belongs to. `Open` carries it directly;
/// others are identified by whichever account currently has `previous` as
/// its frontier. If `previous` exists but isn't anyone's current
/// frontier, the chain already forked past this point — resolved via the
/// stored sideband on the previous block itself.
fn resolve_account(txn: &WriteTxn, block: &Block) -> Option<Account> {
    if let Some(account) = block.account_hint() {
        return Some(account);
    }
    let previous = block.previous()?;
    if let Some(account) = txn.frontier_account(previous) {
        return Some(account);
    }
    txn.get_block(previous).map(|stored| stored.account)
}

/// One block vying for the same root, as seen by the gossip/rebroadcast
/// path (spec §4.C, last paragraph). Deliberately separate from
/// `rai_consensus::Election`'s candidates: this never touches vote tallies.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub hash: BlockHash,
    pub root: Root,
    pub work: u64,
}

/// Tie-break on fork candidacy for the local rebroadcast path only (spec
/// §4.C, last paragraph; Open Question (b)): among two candidates at the
/// same root, prefer the one with strictly greater proof-of-work
/// difficulty as the local "best" to republish. Ties keep `a`. Never fed
/// into `ActiveElections`'s vote tally — rebroadcast preference and
/// consensus are deliberately independent.
pub fn preferred_for_rebroadcast(a: &Candidate, b: &Candidate, pow: &dyn ProofOfWork) -> BlockHash {
    debug_assert_eq!(a.root, b.root, "candidates must share a root");
    if pow.difficulty(b.root, b.work) > pow.difficulty(a.root, a.work) {
        b.hash
    } else {
        a.hash
    }
}

/// The block hash currently occupying `block`'s root, if any, besides
/// `block` itself — used to detect forks (spec §4.C step 8).
fn root_occupant(txn: &WriteTxn, block: &Block, account: Account) -> Option<BlockHash> {
    match block {
        Block::Open(_) => txn.get_account(account).map(|acc| acc.open),
        _ => {
            let previous = block.previous()?;
            // The occupant of a non-open root is whatever block currently
            // follows `previous` in the account's chain, i.e. the
            // account's current frontier if it differs from `previous`.
            let acc = txn.get_account(account)?;
            if acc.frontier != previous {
                Some(acc.frontier)
            } else {
                None
            }
        }
    }
}
