// Wallet key store contract (spec §6): a signing oracle, treated as an
// external collaborator. Validation code never references this trait —
// only the orchestrator and the local voter (when this node represents
// weight) call into it.

use rai_crypto::{Account, Signature};

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("no key held for account {0}")]
    NotFound(Account),
    #[error("key store is locked")]
    Locked,
}

pub trait KeyStore: Send + Sync {
    fn sign(&self, account: Account, message: &[u8]) -> Result<Signature, KeyStoreError>;
}

/// Reference in-process implementation used by tests and local block
/// generation when no external wallet is wired in. Production deployments
/// back this trait with the real wallet (out of scope, per spec §1).
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: std::collections::HashMap<Account, rai_crypto::KeyPair>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        InMemoryKeyStore {
            keys: std::collections::HashMap::new(),
        }
    }

    pub fn insert(&mut self, keypair: rai_crypto::KeyPair) {
        self.keys.insert(keypair.account, keypair);
    }
}

impl KeyStore for InMemoryKeyStore {
    fn sign(&self, account: Account, message: &[u8]) -> Result<Signature, KeyStoreError> {
        self.keys
            .get(&account)
            .map(|kp| kp.sign(message))
            .ok_or(KeyStoreError::NotFound(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rai_crypto::{verify_signature, KeyPair};

    #[test]
    fn in_memory_key_store_signs_for_held_accounts() {
        let kp = KeyPair::generate();
        let account = kp.account;
        let mut store = InMemoryKeyStore::new();
        store.insert(kp);

        let sig = store.sign(account, b"hello").unwrap();
        assert!(verify_signature(b"hello", &sig, &account));
    }

    #[test]
    fn signing_for_unheld_account_errors() {
        let store = InMemoryKeyStore::new();
        let stranger = KeyPair::generate().account;
        assert!(matches!(
            store.sign(stranger, b"x"),
            Err(KeyStoreError::NotFound(_))
        ));
    }
}
