// External transport contract (spec §6). The UDP socket itself lives
// outside the core; callers wire a concrete `NetworkSink`/`InboundMessages`
// pair (or a test double) and the orchestrator only ever speaks through
// these traits.

use rai_consensus::Vote;
use rai_core::Block;
use rai_crypto::BlockHash;
use std::fmt::Debug;
use std::hash::Hash;

/// Identifies a peer. Transports implement this over whatever addressing
/// scheme they use (UDP socket address, onion address, ...).
pub trait Endpoint: Clone + Eq + Hash + Debug + Send + Sync {}
impl<T: Clone + Eq + Hash + Debug + Send + Sync> Endpoint for T {}

/// The three wire messages the core consumes (spec §6).
#[derive(Clone, Debug)]
pub enum WireMessage {
    Publish(Block),
    ConfirmReq(BlockHash),
    ConfirmAck(Vote, Block),
}

/// Fire-and-forget send, matching UDP semantics: no delivery guarantee, no
/// response channel.
pub trait NetworkSink<E: Endpoint>: Send + Sync {
    fn send(&self, to: &E, message: WireMessage);

    fn broadcast(&self, peers: &[E], message: WireMessage)
    where
        WireMessage: Clone,
    {
        for peer in peers {
            self.send(peer, message.clone());
        }
    }
}

/// Polled by the orchestrator's I/O thread; yields the next parsed inbound
/// message, if any, without blocking.
pub trait InboundMessages<E: Endpoint>: Send + Sync {
    fn poll(&self) -> Option<(E, WireMessage)>;
}

/// An in-memory transport used by the end-to-end tests (spec §8): no real
/// UDP socket — each `Node` under test is wired to one of these, and
/// messages are relayed by the test harness, not by this type itself,
/// since the core only ever reaches its peers via `send`. Kept as an
/// ordinary (not `cfg(test)`) module because the root integration test
/// crate depends on `rai-node` as an external crate and needs it too.
pub mod test_double {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ChannelTransport<E: Endpoint> {
        outbox: Mutex<Vec<(E, WireMessage)>>,
        inbox: Mutex<Vec<(E, WireMessage)>>,
    }

    impl<E: Endpoint> ChannelTransport<E> {
        pub fn new() -> Self {
            ChannelTransport {
                outbox: Mutex::new(Vec::new()),
                inbox: Mutex::new(Vec::new()),
            }
        }

        /// Drain everything sent through this transport since the last drain.
        pub fn drain_outbox(&self) -> Vec<(E, WireMessage)> {
            std::mem::take(&mut self.outbox.lock().unwrap())
        }

        /// Deliver a message to this transport's inbox, as if it arrived
        /// over the wire from `from`.
        pub fn deliver(&self, from: E, message: WireMessage) {
            self.inbox.lock().unwrap().push((from, message));
        }
    }

    impl<E: Endpoint> NetworkSink<E> for ChannelTransport<E> {
        fn send(&self, to: &E, message: WireMessage) {
            self.outbox.lock().unwrap().push((to.clone(), message));
        }
    }

    impl<E: Endpoint> InboundMessages<E> for ChannelTransport<E> {
        fn poll(&self) -> Option<(E, WireMessage)> {
            self.inbox.lock().unwrap().pop()
        }
    }
}
