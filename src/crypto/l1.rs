//! L1 (Ethereum) wallet
//!
//! SECURITY: This is the only place the L1 private key lives.
//! - Held in alloy's PrivateKeySigner
//! - Never serialized
//! - Never logged; `Debug` is redacted

use super::{ExternalSignature, ExternalSigner};
use crate::error::SigningError;
use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

/// Signs EIP-191 personal messages for kinds that need L1 authorization.
pub struct L1Wallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl L1Wallet {
    /// Create a wallet from a hex-encoded private key, with or without `0x`.
    pub fn from_hex(key_hex: &str) -> Result<Self, SigningError> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| SigningError::InvalidKey(format!("invalid L1 private key: {}", e)))?;
        let address = signer.address();

        Ok(Self { signer, address })
    }

    /// Checksummed address string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }
}

impl ExternalSigner for L1Wallet {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_message(&self, message: &str) -> Result<ExternalSignature, SigningError> {
        let signature = self
            .signer
            .sign_message_sync(message.as_bytes())
            .map_err(|e| SigningError::Backend(format!("L1 signing failed: {}", e)))?;
        Ok(ExternalSignature::from_rsv(signature.as_bytes()))
    }
}

impl std::fmt::Debug for L1Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("L1Wallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// Recover the address that produced `signature` over the EIP-191 form of
/// `message`.
pub fn recover_l1_address(
    message: &str,
    signature: &ExternalSignature,
) -> Result<Address, SigningError> {
    let parsed = Signature::from_raw(signature.as_bytes())
        .map_err(|e| SigningError::Recovery(e.to_string()))?;
    parsed
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SigningError::Recovery(e.to_string()))
}
