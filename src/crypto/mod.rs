//! Cryptographic capabilities
//!
//! The composer depends only on the three traits below. Production
//! deployments inject the exchange's Poseidon2/Schnorr backend through
//! [`FieldHasher`] and [`LocalSigner`]; the L1 side ships with an alloy-backed
//! implementation in [`L1Wallet`].

pub mod field;
mod hasher;
mod l1;

pub use field::Felt;
pub use hasher::Blake3FieldHasher;
pub use l1::{recover_l1_address, L1Wallet};

use crate::error::SigningError;
use alloy::hex;
use alloy::primitives::Address;
use serde::{Serialize, Serializer};

/// Byte length of a digest: one quintic-extension element
pub const DIGEST_LENGTH: usize = 40;

/// Deterministic hash of a transaction's element sequence
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Digest {
    pub fn from_bytes(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Signature produced by the protocol-native key over a [`Digest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSignature(Vec<u8>);

impl LocalSignature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// 65-byte recoverable secp256k1 signature, `v` in 27/28 form
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ExternalSignature([u8; 65]);

impl ExternalSignature {
    /// Wrap raw `r || s || v` bytes, normalising `v` from 0/1 to 27/28.
    pub fn from_rsv(mut bytes: [u8; 65]) -> Self {
        if bytes[64] < 27 {
            bytes[64] += 27;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }

    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(self.0)
    }
}

impl std::fmt::Debug for ExternalSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExternalSignature({})", self.to_hex())
    }
}

/// Algebraic hash over field elements, producing a [`Digest`]
pub trait FieldHasher: Send + Sync {
    fn hash(&self, elements: &[Felt]) -> Digest;
}

/// The protocol-native (L2) signing key
pub trait LocalSigner: Send + Sync {
    /// Public key registered on the exchange for this API key slot
    fn public_key(&self) -> Vec<u8>;

    fn sign(&self, digest: &Digest) -> Result<LocalSignature, SigningError>;
}

/// An external-chain (L1) key proving control of an Ethereum address
pub trait ExternalSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign `message` with the chain's personal-message convention.
    fn sign_message(&self, message: &str) -> Result<ExternalSignature, SigningError>;

    /// Recover the signing address from `message` and `signature`.
    fn recover_address(
        &self,
        message: &str,
        signature: &ExternalSignature,
    ) -> Result<Address, SigningError> {
        recover_l1_address(message, signature)
    }
}
