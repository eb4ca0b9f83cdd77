// Thin binary entry point: wires configuration, opens the store, and runs
// the orchestrator. CLI argument parsing, the JSON-RPC façade, and the
// desktop UI are external collaborators (spec §1) — this binary only
// proves out `rai_node::Node` standalone; a production deployment drives
// it from whichever front end it ships with.

use rai_core::{Block, OpenBlock};
use rai_crypto::pow::Blake2bThresholdPow;
use rai_crypto::{KeyPair, Signature};
use rai_node::{Node, NodeConfig, Observers, EXIT_STORE_FAILURE};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "rai_config.toml";

fn load_or_default_config() -> NodeConfig {
    let path = std::env::var("RAI_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match NodeConfig::load(std::path::Path::new(&path)) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("no usable config at {}: {} — using defaults", path, err);
            NodeConfig::default()
        }
    }
}

/// Standalone development genesis: a single self-representing account
/// holding the entire configured supply. A real deployment loads the
/// network's real genesis block instead (external, per spec §1).
fn dev_genesis() -> (Block, rai_crypto::BlockHash, u128) {
    let genesis_key = KeyPair::from_secret([0x11; 32]);
    let source = rai_crypto::BlockHash([0xff; 32]);
    let mut open = OpenBlock {
        source,
        representative: genesis_key.account,
        account: genesis_key.account,
        signature: Signature([0; 64]),
        work: 0,
    };
    let hash = Block::Open(open.clone()).signing_hash();
    open.signature = genesis_key.sign(&hash.0);
    (Block::Open(open), source, u128::MAX)
}

/// Seed the pending entry `dev_genesis`'s open block consumes, standing in
/// for the network's real fixed genesis supply (`Node::new` only ever
/// processes an open block against a pending entry that already exists —
/// it never manufactures supply itself). No-op if the account already
/// has an open block, so this is safe to call on every startup.
fn seed_genesis_pending(
    config: &NodeConfig,
    genesis: &Block,
    source: rai_crypto::BlockHash,
    amount: u128,
) -> Result<(), rai_store::StoreError> {
    let account = genesis
        .account_hint()
        .expect("dev_genesis always builds an Open block");
    let store = rai_store::Store::open(&config.data_path)?;
    if store.begin_read().get_account(account).is_some() {
        return Ok(());
    }
    let mut txn = store.begin_write();
    txn.put_pending(
        account,
        source,
        rai_store::PendingRecord {
            sender: account,
            amount,
        },
    );
    txn.commit()?;
    store.flush()
}

fn main() -> ExitCode {
    let config = load_or_default_config();
    rai_node::logging::init(&config.log_level);

    let pow: Arc<dyn rai_crypto::pow::ProofOfWork> =
        Arc::new(Blake2bThresholdPow::default());

    let (genesis, genesis_source, genesis_supply) = dev_genesis();
    if let Err(err) = seed_genesis_pending(&config, &genesis, genesis_source, genesis_supply) {
        log::error!("failed to seed genesis pending entry: {}", err);
        return ExitCode::from(EXIT_STORE_FAILURE as u8);
    }

    let mut node = match Node::new(&config, genesis, pow, Observers::new()) {
        Ok(node) => node,
        Err(err) => {
            log::error!("failed to start node: {}", err);
            return ExitCode::from(EXIT_STORE_FAILURE as u8);
        }
    };

    log::info!("rai-node started, data_path={}", config.data_path.display());

    // The network layer (inbound publish/confirm_req/confirm_ack, peer
    // discovery, bootstrap transport) is external (spec §1), as is
    // real signal handling (owned by whichever front end embeds this
    // binary). Standalone, this just arms the election timer forever;
    // `Node`'s `Drop` runs `shutdown` when the process exits normally.
    loop {
        node.tick_elections(0);
        std::thread::sleep(Duration::from_millis(500));
    }
}
