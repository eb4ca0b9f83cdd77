// Shared end-to-end test harness (spec §8 scenarios 1-6): wires two or
// three in-process `Node`s together through `ChannelTransport` in-memory
// transports and a small bounded relay loop standing in for the network
// I/O thread a real deployment would run. No sleep loops anywhere here —
// the relay drains until a round moves nothing (Design Note: "Polling
// loops in tests").

#![allow(dead_code)]

use rai_core::{Block, OpenBlock, SendBlock};
use rai_crypto::pow::ProofOfWork;
use rai_crypto::{Account, BlockHash, KeyPair, Root, Signature};
use rai_node::network::test_double::ChannelTransport;
use rai_node::network::{InboundMessages, WireMessage};
use rai_node::{Node, NodeConfig, Observers};
use rai_store::PendingRecord;
use tempfile::TempDir;

/// Accepts any work value: these scenarios exercise ledger/consensus state
/// transitions, not proof-of-work thresholds.
pub struct AlwaysValidPow;
impl ProofOfWork for AlwaysValidPow {
    fn verify(&self, _root: Root, _nonce: u64) -> bool {
        true
    }
    fn generate(&self, _root: Root) -> u64 {
        0
    }
    fn difficulty(&self, _root: Root, _nonce: u64) -> u64 {
        0
    }
}

/// One peer under test: its `Node`, the `TempDir` backing its store (kept
/// alive for the peer's lifetime), and the in-memory transport other peers
/// relay messages through.
pub struct Peer {
    pub id: u8,
    pub node: Node,
    pub transport: ChannelTransport<u8>,
    _dir: TempDir,
}

/// Builds the shared genesis open block (deterministic: same key, same
/// synthetic source hash) every peer in a scenario seeds independently,
/// standing in for the network's real fixed genesis.
pub fn genesis_block(kp: &KeyPair) -> (Block, BlockHash) {
    let source = BlockHash([0xff; 32]);
    let mut open = OpenBlock {
        source,
        representative: kp.account,
        account: kp.account,
        signature: Signature([0; 64]),
        work: 0,
    };
    let hash = Block::Open(open.clone()).signing_hash();
    open.signature = kp.sign(&hash.0);
    (Block::Open(open), source)
}

/// Spawns one peer with its own store, pre-seeded with `supply` pending at
/// the genesis source so the genesis open block can consume it.
pub fn spawn_peer(id: u8, genesis: &KeyPair, supply: u128) -> Peer {
    let dir = TempDir::new().unwrap();
    let config = NodeConfig {
        data_path: dir.path().to_path_buf(),
        ..NodeConfig::default()
    };
    let (genesis_open, genesis_source) = genesis_block(genesis);

    let store = rai_store::Store::open(&config.data_path).unwrap();
    let mut txn = store.begin_write();
    txn.put_pending(
        genesis.account,
        genesis_source,
        PendingRecord {
            sender: genesis.account,
            amount: supply,
        },
    );
    txn.commit().unwrap();
    drop(store);

    let node = Node::new(
        &config,
        genesis_open,
        std::sync::Arc::new(AlwaysValidPow),
        Observers::new(),
    )
    .unwrap();

    Peer {
        id,
        node,
        transport: ChannelTransport::new(),
        _dir: dir,
    }
}

pub fn signed_send(kp: &KeyPair, previous: BlockHash, destination: Account, balance_after_send: u128) -> Block {
    let mut send = SendBlock {
        previous,
        destination,
        balance_after_send,
        signature: Signature([0; 64]),
        work: 0,
    };
    let hash = Block::Send(send.clone()).signing_hash();
    send.signature = kp.sign(&hash.0);
    Block::Send(send)
}

pub fn signed_open(kp: &KeyPair, source: BlockHash, representative: Account) -> Block {
    let mut open = OpenBlock {
        source,
        representative,
        account: kp.account,
        signature: Signature([0; 64]),
        work: 0,
    };
    let hash = Block::Open(open.clone()).signing_hash();
    open.signature = kp.sign(&hash.0);
    Block::Open(open)
}

pub fn sign_vote(rep: &KeyPair, root: Root, sequence: u64, block_hash: BlockHash) -> rai_consensus::Vote {
    let mut message = Vec::with_capacity(72);
    message.extend_from_slice(root.as_bytes());
    message.extend_from_slice(&sequence.to_be_bytes());
    message.extend_from_slice(block_hash.as_bytes());
    rai_consensus::Vote {
        representative: rep.account,
        sequence,
        block_hash,
        signature: rep.sign(&message),
    }
}

/// Publishes `block` from `origin` to every other peer's transport and
/// immediately delivers it to `origin`'s own store too, matching
/// `Node::submit`'s "single entry point for local generation or inbound
/// publish" contract (spec §4.I).
pub fn broadcast_block(peers: &[Peer], origin: u8, block: Block) {
    for peer in peers {
        if peer.id == origin {
            peer.node.submit(block.clone());
        } else {
            peer.transport.deliver(origin, WireMessage::Publish(block.clone()));
        }
    }
}

/// Drains every peer's inbox and applies whatever arrived, until a full
/// round moves nothing. Bounded, not a sleep loop (Design Note: "Polling
/// loops in tests") — each peer's own `Node::submit`/`submit_vote` is
/// synchronous, so there is never anything to wait on beyond relaying the
/// messages themselves.
pub fn pump_until_quiet(peers: &[Peer], max_rounds: usize) {
    for _ in 0..max_rounds {
        let mut moved = false;
        for peer in peers {
            while let Some((from, message)) = peer.transport.poll() {
                moved = true;
                apply_inbound(peer, from, message, peers);
            }
        }
        if !moved {
            break;
        }
    }
}

fn apply_inbound(peer: &Peer, _from: u8, message: WireMessage, peers: &[Peer]) {
    match message {
        WireMessage::Publish(block) => {
            let result = peer.node.submit(block);
            let _ = result;
        }
        WireMessage::ConfirmAck(vote, block) => {
            let root = block.root();
            peer.node.submit_vote(root, &vote);
        }
        WireMessage::ConfirmReq(_) => {}
    }
    let _ = peers;
}

pub fn balance_of(node: &Node, account: Account) -> u128 {
    node.store()
        .begin_read()
        .get_account(account)
        .map(|a| a.balance)
        .unwrap_or(0)
}
