use rai_crypto::{digest, Account, BlockHash, Root, Signature};
use serde::{Deserialize, Serialize};

/// One-byte kind tag prefixed to the canonical encoding and folded into
/// the signing hash for domain separation between variants.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum BlockKind {
    Send = 0,
    Receive = 1,
    Open = 2,
    Change = 3,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("truncated block: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("unknown block kind tag {0}")]
    UnknownKind(u8),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance_after_send: u128,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Send(_) => BlockKind::Send,
            Block::Receive(_) => BlockKind::Receive,
            Block::Open(_) => BlockKind::Open,
            Block::Change(_) => BlockKind::Change,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            Block::Send(b) => b.signature,
            Block::Receive(b) => b.signature,
            Block::Open(b) => b.signature,
            Block::Change(b) => b.signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Open(b) => b.work,
            Block::Change(b) => b.work,
        }
    }

    /// The previous hash (send/receive/change) or source (open) this
    /// block names as its predecessor dependency, if any besides the
    /// root itself. `Open` has no previous — its dependency is `source`.
    pub fn previous(&self) -> Option<BlockHash> {
        match self {
            Block::Send(b) => Some(b.previous),
            Block::Receive(b) => Some(b.previous),
            Block::Change(b) => Some(b.previous),
            Block::Open(_) => None,
        }
    }

    /// The source block hash this block claims to receive from, if any.
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Block::Receive(b) => Some(b.source),
            Block::Open(b) => Some(b.source),
            Block::Send(_) | Block::Change(_) => None,
        }
    }

    /// The root a block is organised under for fork elections: previous
    /// hash for send/receive/change, account public key for open.
    pub fn root(&self) -> Root {
        match self {
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Change(b) => b.previous,
            Block::Open(b) => b.account,
        }
    }

    /// The account this block belongs to, when known without a store
    /// lookup (only `Open` carries it directly).
    pub fn account_hint(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.account),
            _ => None,
        }
    }

    /// Content hash: Sha3-256 over every field except signature and work,
    /// with the kind tag folded in for domain separation.
    pub fn signing_hash(&self) -> BlockHash {
        match self {
            Block::Send(b) => digest(&[
                &[BlockKind::Send as u8],
                b.previous.as_bytes(),
                b.destination.as_bytes(),
                &b.balance_after_send.to_be_bytes(),
            ]),
            Block::Receive(b) => digest(&[
                &[BlockKind::Receive as u8],
                b.previous.as_bytes(),
                b.source.as_bytes(),
            ]),
            Block::Open(b) => digest(&[
                &[BlockKind::Open as u8],
                b.source.as_bytes(),
                b.representative.as_bytes(),
                b.account.as_bytes(),
            ]),
            Block::Change(b) => digest(&[
                &[BlockKind::Change as u8],
                b.previous.as_bytes(),
                b.representative.as_bytes(),
            ]),
        }
    }

    /// The block's identity hash: callers use this, not `signing_hash`,
    /// as the key under which the block is stored and referenced.
    pub fn hash(&self) -> BlockHash {
        self.signing_hash()
    }

    /// Canonical big-endian encoding, kind tag + fields + signature + work,
    /// exactly the layouts of spec §6.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 168);
        out.push(self.kind() as u8);
        match self {
            Block::Send(b) => {
                out.extend_from_slice(b.previous.as_bytes());
                out.extend_from_slice(b.destination.as_bytes());
                out.extend_from_slice(&b.balance_after_send.to_be_bytes());
                out.extend_from_slice(&b.signature.0);
                out.extend_from_slice(&b.work.to_be_bytes());
            }
            Block::Receive(b) => {
                out.extend_from_slice(b.previous.as_bytes());
                out.extend_from_slice(b.source.as_bytes());
                out.extend_from_slice(&b.signature.0);
                out.extend_from_slice(&b.work.to_be_bytes());
            }
            Block::Open(b) => {
                out.extend_from_slice(b.source.as_bytes());
                out.extend_from_slice(b.representative.as_bytes());
                out.extend_from_slice(b.account.as_bytes());
                out.extend_from_slice(&b.signature.0);
                out.extend_from_slice(&b.work.to_be_bytes());
            }
            Block::Change(b) => {
                out.extend_from_slice(b.previous.as_bytes());
                out.extend_from_slice(b.representative.as_bytes());
                out.extend_from_slice(&b.signature.0);
                out.extend_from_slice(&b.work.to_be_bytes());
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Block, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Truncated {
                expected: 1,
                got: 0,
            });
        }
        let kind = bytes[0];
        let rest = &bytes[1..];

        let read_hash = |buf: &[u8], off: usize| -> Result<BlockHash, CodecError> {
            BlockHash::from_slice(
                buf.get(off..off + 32)
                    .ok_or(CodecError::Truncated {
                        expected: off + 32,
                        got: buf.len(),
                    })?,
            )
            .map_err(|_| CodecError::Truncated {
                expected: off + 32,
                got: buf.len(),
            })
        };
        let read_sig = |buf: &[u8], off: usize| -> Result<Signature, CodecError> {
            Signature::from_slice(buf.get(off..off + 64).ok_or(CodecError::Truncated {
                expected: off + 64,
                got: buf.len(),
            })?)
            .map_err(|_| CodecError::Truncated {
                expected: off + 64,
                got: buf.len(),
            })
        };
        let read_u64 = |buf: &[u8], off: usize| -> Result<u64, CodecError> {
            let arr: [u8; 8] = buf
                .get(off..off + 8)
                .ok_or(CodecError::Truncated {
                    expected: off + 8,
                    got: buf.len(),
                })?
                .try_into()
                .unwrap();
            Ok(u64::from_be_bytes(arr))
        };
        let read_u128 = |buf: &[u8], off: usize| -> Result<u128, CodecError> {
            let arr: [u8; 16] = buf
                .get(off..off + 16)
                .ok_or(CodecError::Truncated {
                    expected: off + 16,
                    got: buf.len(),
                })?
                .try_into()
                .unwrap();
            Ok(u128::from_be_bytes(arr))
        };

        match kind {
            k if k == BlockKind::Send as u8 => {
                let previous = read_hash(rest, 0)?;
                let destination = read_hash(rest, 32)?;
                let balance_after_send = read_u128(rest, 64)?;
                let signature = read_sig(rest, 80)?;
                let work = read_u64(rest, 144)?;
                Ok(Block::Send(SendBlock {
                    previous,
                    destination,
                    balance_after_send,
                    signature,
                    work,
                }))
            }
            k if k == BlockKind::Receive as u8 => {
                let previous = read_hash(rest, 0)?;
                let source = read_hash(rest, 32)?;
                let signature = read_sig(rest, 64)?;
                let work = read_u64(rest, 128)?;
                Ok(Block::Receive(ReceiveBlock {
                    previous,
                    source,
                    signature,
                    work,
                }))
            }
            k if k == BlockKind::Open as u8 => {
                let source = read_hash(rest, 0)?;
                let representative = read_hash(rest, 32)?;
                let account = read_hash(rest, 64)?;
                let signature = read_sig(rest, 96)?;
                let work = read_u64(rest, 160)?;
                Ok(Block::Open(OpenBlock {
                    source,
                    representative,
                    account,
                    signature,
                    work,
                }))
            }
            k if k == BlockKind::Change as u8 => {
                let previous = read_hash(rest, 0)?;
                let representative = read_hash(rest, 32)?;
                let signature = read_sig(rest, 64)?;
                let work = read_u64(rest, 128)?;
                Ok(Block::Change(ChangeBlock {
                    previous,
                    representative,
                    signature,
                    work,
                }))
            }
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}
