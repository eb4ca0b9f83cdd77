// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-NODE
//
// Bootstrap reconciler, observer dispatch, and the orchestrator that binds
// the rest of the workspace into a running node (spec §4.G, §4.H, §4.I).
// Configuration and the external-contract shapes (network, key store) also
// live here, since they're what the orchestrator wires at startup.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod bootstrap;
pub mod config;
pub mod executor;
pub mod keystore;
pub mod logging;
pub mod network;
mod node;
pub mod observers;

pub use config::{ConfigError, NodeConfig};
pub use keystore::{InMemoryKeyStore, KeyStore, KeyStoreError};
pub use node::{Node, NodeError, EXIT_STORE_FAILURE};
pub use observers::Observers;
