// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RAI-CRYPTO
//
// Signing, hashing and proof-of-work contracts used by the ledger.
// Ed25519 keypair generation/signing/verification, the 32-byte hash
// newtypes shared by every crate in the workspace, and the pluggable
// proof-of-work contract (verify/generate/difficulty).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod pow;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use zeroize::Zeroize;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length")]
    InvalidKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A content-addressed 32-byte digest. Used for block hashes, account
/// public keys, and roots alike — they share representation but not
/// provenance, so callers should prefer the type aliases below over this
/// name directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Hash32(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// An account identity: the account's Ed25519 public key.
pub type Account = Hash32;
/// The content hash of a stored block.
pub type BlockHash = Hash32;
/// The root a block is organised under for fork elections: previous hash
/// for send/receive/change, account public key for open.
pub type Root = Hash32;

/// Detached Ed25519 signature over a block's signing hash.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Signature(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An Ed25519 keypair. The secret bytes are zeroized on drop.
pub struct KeyPair {
    pub account: Account,
    secret: [u8; 32],
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let account = Hash32(signing_key.verifying_key().to_bytes());
        KeyPair {
            account,
            secret: signing_key.to_bytes(),
        }
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&secret);
        let account = Hash32(signing_key.verifying_key().to_bytes());
        KeyPair { account, secret }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = SigningKey::from_bytes(&self.secret);
        Signature(signing_key.sign(message).to_bytes())
    }
}

/// Verify a detached signature against an account's public key.
pub fn verify_signature(message: &[u8], signature: &Signature, account: &Account) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(&account.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(message, &sig).is_ok()
}

/// Canonical Sha3-256 digest used for block content hashes and the
/// deterministic ledger state root.
pub fn digest(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Sha3_256::new();
    for p in parts {
        hasher.update(p);
    }
    Hash32(hasher.finalize().into())
}
