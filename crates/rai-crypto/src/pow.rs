// Proof-of-work contract (§6): the generator itself is an external,
// opaque collaborator — this module defines the trait every caller codes
// against plus a reference implementation used by tests and local block
// generation when no external generator is wired in.

use crate::Root;
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

/// Difficulty is a monotone comparison only (§6) — never used for
/// anything but rebroadcast tie-breaking (Open Question b).
pub trait ProofOfWork: Send + Sync {
    fn verify(&self, root: Root, nonce: u64) -> bool;
    fn generate(&self, root: Root) -> u64;
    fn difficulty(&self, root: Root, nonce: u64) -> u64;
}

/// Blake2b-threshold reference implementation: the work value must hash
/// (with the root) to a digest with at least `min_leading_zero_bits`
/// leading zero bits. `difficulty` returns the actual leading-zero-bit
/// count so higher is "more work", matching the monotone contract.
pub struct Blake2bThresholdPow {
    pub min_leading_zero_bits: u32,
}

impl Default for Blake2bThresholdPow {
    fn default() -> Self {
        Blake2bThresholdPow {
            min_leading_zero_bits: 8,
        }
    }
}

impl Blake2bThresholdPow {
    fn work_hash(&self, root: Root, nonce: u64) -> [u8; 32] {
        let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b output length");
        hasher.update(&nonce.to_be_bytes());
        hasher.update(root.as_bytes());
        let mut out = [0u8; 32];
        hasher
            .finalize_variable(&mut out)
            .expect("output buffer matches the configured length");
        out
    }

    fn leading_zero_bits(hash: &[u8; 32]) -> u32 {
        let mut zero_bits = 0u32;
        for byte in hash {
            if *byte == 0 {
                zero_bits += 8;
            } else {
                zero_bits += byte.leading_zeros();
                break;
            }
        }
        zero_bits
    }
}

impl ProofOfWork for Blake2bThresholdPow {
    fn verify(&self, root: Root, nonce: u64) -> bool {
        self.difficulty(root, nonce) >= self.min_leading_zero_bits as u64
    }

    fn generate(&self, root: Root) -> u64 {
        let mut nonce: u64 = 0;
        loop {
            if self.verify(root, nonce) {
                return nonce;
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    fn difficulty(&self, root: Root, nonce: u64) -> u64 {
        Self::leading_zero_bits(&self.work_hash(root, nonce)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_work_verifies() {
        let pow = Blake2bThresholdPow {
            min_leading_zero_bits: 8,
        };
        let root = Root::ZERO;
        let nonce = pow.generate(root);
        assert!(pow.verify(root, nonce));
    }

    #[test]
    fn difficulty_is_monotone_with_zero_bits() {
        let pow = Blake2bThresholdPow::default();
        let root = Root::from_slice(&[7u8; 32]).unwrap();
        let nonce = pow.generate(root);
        assert!(pow.difficulty(root, nonce) >= pow.min_leading_zero_bits as u64);
    }
}
