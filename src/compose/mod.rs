//! Hash & signature composer
//!
//! Turns a validated [`Transaction`] into a [`SignedTransaction`]:
//!
//! 1. Project the transaction into Goldilocks elements ([`elements`])
//! 2. Hash them with the injected [`FieldHasher`] into a [`Digest`]
//! 3. Sign the digest with the [`LocalSigner`]
//! 4. For L1-authorized kinds, render the [`template`] and sign it with the
//!    [`ExternalSigner`], last
//!
//! The composer holds no mutable state and may be shared freely.

pub mod elements;
pub mod template;

use crate::crypto::{
    Digest, ExternalSignature, ExternalSigner, FieldHasher, LocalSignature, LocalSigner,
};
use crate::error::{EncodingError, SigningError};
use crate::tx::{ProtocolBounds, Transaction, TxKind};
use crate::Result;
use base64::Engine;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Digest and signature engine, configured with a hash backend and bounds.
#[derive(Clone)]
pub struct Composer {
    hasher: Arc<dyn FieldHasher>,
    bounds: ProtocolBounds,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl Composer {
    pub fn new(hasher: Arc<dyn FieldHasher>, bounds: ProtocolBounds) -> Self {
        Self { hasher, bounds }
    }

    pub fn bounds(&self) -> &ProtocolBounds {
        &self.bounds
    }

    /// Deterministic digest of `tx` on `chain_id`. Pure.
    pub fn digest(&self, tx: &Transaction, chain_id: u32) -> std::result::Result<Digest, EncodingError> {
        let elements = elements::project(tx, chain_id)?;
        let digest = self.hasher.hash(&elements);
        debug!(
            kind = %tx.kind(),
            account_index = tx.header().account_index,
            api_key_index = tx.header().api_key_index,
            nonce = tx.nonce(),
            elements = elements.len(),
            "computed transaction digest"
        );
        Ok(digest)
    }

    /// Digest `tx` and sign the digest with the local key.
    pub fn sign(
        &self,
        tx: &Transaction,
        chain_id: u32,
        signer: &dyn LocalSigner,
    ) -> Result<(Digest, LocalSignature)> {
        let digest = self.digest(tx, chain_id)?;
        let signature = signer.sign(&digest)?;
        Ok((digest, signature))
    }

    /// The message an L1 signer must sign for `tx`, if its kind takes one.
    pub fn l1_message(&self, tx: &Transaction, chain_id: u32) -> Option<String> {
        template::render(tx, chain_id)
    }

    /// Sign the rendered L1 message for `tx`. Independent of the digest.
    pub fn sign_external(
        &self,
        tx: &Transaction,
        chain_id: u32,
        signer: &dyn ExternalSigner,
    ) -> std::result::Result<ExternalSignature, SigningError> {
        let message = self
            .l1_message(tx, chain_id)
            .ok_or(SigningError::ExternalNotApplicable(tx.kind()))?;
        signer.sign_message(&message)
    }

    /// Validate, digest and attach every signature `tx`'s kind requires.
    ///
    /// `external` may be `None` for kinds that need only the local signature;
    /// it is ignored for those kinds if supplied.
    pub fn finalize(
        &self,
        tx: Transaction,
        chain_id: u32,
        local: &dyn LocalSigner,
        external: Option<&dyn ExternalSigner>,
    ) -> Result<SignedTransaction> {
        tx.validate(&self.bounds)?;

        let requirement = tx.signature_requirement();
        let external = match (requirement.needs_external(), external) {
            (true, None) => return Err(SigningError::MissingExternalSigner(tx.kind()).into()),
            (true, Some(signer)) => Some(signer),
            (false, _) => None,
        };

        let (digest, local_signature) = self.sign(&tx, chain_id, local)?;
        let external_signature = match external {
            Some(signer) => Some(self.sign_external(&tx, chain_id, signer)?),
            None => None,
        };

        Ok(SignedTransaction {
            tx,
            chain_id,
            digest,
            local_signature,
            external_signature,
        })
    }

    /// Recompute the digest of a signed transaction and reject any drift.
    pub fn ensure_digest(&self, signed: &SignedTransaction) -> std::result::Result<(), EncodingError> {
        let fresh = self.digest(&signed.tx, signed.chain_id)?;
        if fresh != signed.digest {
            return Err(EncodingError::DigestMismatch {
                kind: signed.tx.kind(),
            });
        }
        Ok(())
    }
}

/// A transaction with all the signatures its kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    chain_id: u32,
    digest: Digest,
    local_signature: LocalSignature,
    external_signature: Option<ExternalSignature>,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn kind(&self) -> TxKind {
        self.tx.kind()
    }

    pub fn chain_id(&self) -> u32 {
        self.chain_id
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn local_signature(&self) -> &LocalSignature {
        &self.local_signature
    }

    pub fn external_signature(&self) -> Option<&ExternalSignature> {
        self.external_signature.as_ref()
    }

    /// Transaction hash as reported back by the exchange
    pub fn tx_hash(&self) -> String {
        self.digest.to_hex()
    }

    /// The exchange's `tx_info` JSON document.
    pub fn tx_info(&self) -> std::result::Result<String, serde_json::Error> {
        let mut fields = Map::new();
        if let Value::Object(header) = serde_json::to_value(self.tx.header())? {
            fields.extend(header);
        }
        if let Value::Object(body) = serde_json::to_value(self.tx.body())? {
            fields.extend(body);
        }

        let mut fields = match pascal_case(Value::Object(fields)) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if self.kind() == TxKind::Transfer {
            if let Some(from) = fields.remove("AccountIndex") {
                fields.insert("FromAccountIndex".to_string(), from);
            }
        }

        let sig = self.local_signature.as_bytes();
        let sig = match self.kind() {
            TxKind::ChangePubKey => alloy::hex::encode(sig),
            _ => base64::engine::general_purpose::STANDARD.encode(sig),
        };
        fields.insert("Sig".to_string(), Value::String(sig));
        if let Some(l1) = &self.external_signature {
            fields.insert("L1Sig".to_string(), Value::String(l1.to_hex()));
        }

        serde_json::to_string(&Value::Object(fields))
    }
}

fn pascal_case(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (pascal_key(&key), pascal_case(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(pascal_case).collect()),
        other => other,
    }
}

fn pascal_key(key: &str) -> String {
    match key {
        "usdc_fee" => "USDCFee".to_string(),
        "usdc_amount" => "USDCAmount".to_string(),
        "order_type" => "Type".to_string(),
        _ => key
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect(),
    }
}
