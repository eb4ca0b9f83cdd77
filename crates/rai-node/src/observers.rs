// Observer dispatch (spec §4.H): sinks registered at startup, fired in
// registration order after the owning write transaction commits, never
// inline in the writer thread and never inside the transaction itself.

use rai_consensus::Vote;
use rai_core::Block;
use rai_crypto::Account;

type BlockSink = Box<dyn Fn(&Block, Account, u128) + Send + Sync>;
type BalanceSink = Box<dyn Fn(Account, u128) + Send + Sync>;
type EndpointSink = Box<dyn Fn(&str) + Send + Sync>;
type VoteSink = Box<dyn Fn(&Vote) + Send + Sync>;
type BootstrapSink = Box<dyn Fn() + Send + Sync>;

/// Registered sinks for the five event kinds spec §4.H names. Registration
/// is append-only and happens once at startup (spec §4.I); dispatch always
/// replays sinks in the order they were registered.
#[derive(Default)]
pub struct Observers {
    block: Vec<BlockSink>,
    balance: Vec<BalanceSink>,
    endpoint: Vec<EndpointSink>,
    vote: Vec<VoteSink>,
    bootstrap: Vec<BootstrapSink>,
}

impl Observers {
    pub fn new() -> Self {
        Observers::default()
    }

    pub fn on_block(&mut self, sink: impl Fn(&Block, Account, u128) + Send + Sync + 'static) {
        self.block.push(Box::new(sink));
    }

    pub fn on_balance_change(&mut self, sink: impl Fn(Account, u128) + Send + Sync + 'static) {
        self.balance.push(Box::new(sink));
    }

    pub fn on_endpoint(&mut self, sink: impl Fn(&str) + Send + Sync + 'static) {
        self.endpoint.push(Box::new(sink));
    }

    pub fn on_vote(&mut self, sink: impl Fn(&Vote) + Send + Sync + 'static) {
        self.vote.push(Box::new(sink));
    }

    pub fn on_bootstrap_complete(&mut self, sink: impl Fn() + Send + Sync + 'static) {
        self.bootstrap.push(Box::new(sink));
    }

    /// Fire every block sink in registration order. The caller (the
    /// orchestrator's work executor, §4.I) is responsible for only calling
    /// this after the owning write transaction has committed — that is the
    /// coherence contract spec §4.H tests directly.
    pub fn fire_block(&self, block: &Block, account: Account, amount: u128) {
        for sink in &self.block {
            sink(block, account, amount);
        }
    }

    pub fn fire_balance_change(&self, account: Account, balance: u128) {
        for sink in &self.balance {
            sink(account, balance);
        }
    }

    pub fn fire_endpoint(&self, endpoint: &str) {
        for sink in &self.endpoint {
            sink(endpoint);
        }
    }

    pub fn fire_vote(&self, vote: &Vote) {
        for sink in &self.vote {
            sink(vote);
        }
    }

    pub fn fire_bootstrap_complete(&self) {
        for sink in &self.bootstrap {
            sink();
        }
    }
}
