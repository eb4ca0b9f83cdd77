// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-CORE
//
// Block variants and their canonical binary encoding/hashing. Purely
// structural — no store or validation logic lives here.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod block;

pub use block::{Block, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};
pub use rai_crypto::{Account, BlockHash, Root, Signature};
