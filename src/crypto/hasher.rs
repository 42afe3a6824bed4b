//! Blake3-backed field hasher
//!
//! Deterministic and collision resistant, with output reduced into five
//! canonical Goldilocks limbs so it has the same shape as the exchange's
//! Poseidon2 quintic-extension digest. The exchange itself verifies
//! Poseidon2 digests; use this backend for offline tooling, previews and
//! tests, and inject the production permutation for live submission.

use super::field::Felt;
use super::{Digest, FieldHasher, DIGEST_LENGTH};

const DOMAIN: &str = "lighter-signer 2024 goldilocks element sponge v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3FieldHasher;

impl FieldHasher for Blake3FieldHasher {
    fn hash(&self, elements: &[Felt]) -> Digest {
        let mut hasher = blake3::Hasher::new_derive_key(DOMAIN);
        hasher.update(&(elements.len() as u64).to_le_bytes());
        for element in elements {
            hasher.update(&element.to_le_bytes());
        }

        let mut wide = [0u8; DIGEST_LENGTH];
        hasher.finalize_xof().fill(&mut wide);

        let mut out = [0u8; DIGEST_LENGTH];
        for (src, dst) in wide.chunks_exact(8).zip(out.chunks_exact_mut(8)) {
            let mut limb = [0u8; 8];
            limb.copy_from_slice(src);
            dst.copy_from_slice(&Felt::from_u64(u64::from_le_bytes(limb)).to_le_bytes());
        }
        Digest::from_bytes(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::field::{canonical_le_limbs, MODULUS};

    #[test]
    fn output_limbs_are_canonical() {
        let digest = Blake3FieldHasher.hash(&[Felt::from_u64(7), Felt::from_u64(MODULUS - 1)]);
        let limbs = canonical_le_limbs("digest", digest.as_bytes()).unwrap();
        assert_eq!(limbs.len(), 5);
    }

    #[test]
    fn element_order_matters() {
        let a = Blake3FieldHasher.hash(&[Felt::from_u64(1), Felt::from_u64(2)]);
        let b = Blake3FieldHasher.hash(&[Felt::from_u64(2), Felt::from_u64(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn trailing_zero_changes_digest() {
        let a = Blake3FieldHasher.hash(&[Felt::from_u64(1)]);
        let b = Blake3FieldHasher.hash(&[Felt::from_u64(1), Felt::ZERO]);
        assert_ne!(a, b);
    }
}
