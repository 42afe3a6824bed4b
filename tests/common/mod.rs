#![allow(dead_code)]

use async_trait::async_trait;
use lighter_signer::compose::Composer;
use lighter_signer::crypto::{Blake3FieldHasher, Digest, LocalSignature, LocalSigner};
use lighter_signer::transport::{
    BatchSubmitResponse, NonceSource, ReferencePriceSource, SubmitResponse, TxSubmitter,
};
use lighter_signer::{
    EngineConfig, Identity, NonceCoordinator, SignedTransaction, SignerClient, SigningError,
    TransportError,
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Anvil account #0. DO NOT use in production!
pub const L1_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const L1_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Deterministic stand-in for the exchange's Schnorr signer
pub struct StubSigner {
    key: [u8; 32],
}

impl Default for StubSigner {
    fn default() -> Self {
        Self { key: [7u8; 32] }
    }
}

impl LocalSigner for StubSigner {
    fn public_key(&self) -> Vec<u8> {
        // Five canonical limbs
        let mut pk = blake3::keyed_hash(&self.key, b"public key").as_bytes().to_vec();
        pk.extend_from_slice(&[0u8; 8]);
        for limb in pk.chunks_mut(8) {
            limb[7] = 0;
        }
        pk
    }

    fn sign(&self, digest: &Digest) -> Result<LocalSignature, SigningError> {
        let mut out = [0u8; 80];
        blake3::Hasher::new_keyed(&self.key)
            .update(digest.as_bytes())
            .finalize_xof()
            .fill(&mut out);
        Ok(LocalSignature::new(out.to_vec()))
    }
}

/// In-memory exchange recording every submission
pub struct MockExchange {
    pub baseline: AtomicI64,
    pub nonce_calls: AtomicUsize,
    pub reject_submissions: AtomicBool,
    pub submitted: Mutex<Vec<(u8, String)>>,
    pub best_ask: String,
    pub best_bid: String,
}

impl MockExchange {
    pub fn at(baseline: i64) -> Arc<Self> {
        Self::with_book(baseline, "300050", "299950")
    }

    pub fn with_book(baseline: i64, best_ask: &str, best_bid: &str) -> Arc<Self> {
        Arc::new(Self {
            baseline: AtomicI64::new(baseline),
            nonce_calls: AtomicUsize::new(0),
            reject_submissions: AtomicBool::new(false),
            submitted: Mutex::new(Vec::new()),
            best_ask: best_ask.to_string(),
            best_bid: best_bid.to_string(),
        })
    }

    pub fn submissions(&self) -> Vec<(u8, String)> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, signed: &SignedTransaction) -> Result<(), TransportError> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                code: 21104,
                message: "invalid nonce".to_string(),
            });
        }
        let info = signed.tx_info()?;
        self.submitted
            .lock()
            .unwrap()
            .push((signed.kind().as_u8(), info));
        Ok(())
    }
}

#[async_trait]
impl NonceSource for MockExchange {
    async fn fetch_nonce(&self, _identity: Identity) -> Result<i64, TransportError> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.baseline.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl TxSubmitter for MockExchange {
    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResponse, TransportError> {
        self.record(signed)?;
        Ok(SubmitResponse {
            code: 200,
            message: None,
            tx_hash: Some(signed.tx_hash()),
        })
    }

    async fn submit_batch(
        &self,
        signed: &[SignedTransaction],
    ) -> Result<BatchSubmitResponse, TransportError> {
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                code: 21104,
                message: "invalid nonce".to_string(),
            });
        }
        for tx in signed {
            self.record(tx)?;
        }
        Ok(BatchSubmitResponse {
            code: 200,
            message: None,
            tx_hash: signed.iter().map(SignedTransaction::tx_hash).collect(),
        })
    }
}

#[async_trait]
impl ReferencePriceSource for MockExchange {
    async fn fetch_reference_price(
        &self,
        _market_index: i16,
        is_buy: bool,
    ) -> Result<String, TransportError> {
        Ok(if is_buy {
            self.best_ask.clone()
        } else {
            self.best_bid.clone()
        })
    }
}

pub fn config(account_index: i64, api_key_index: u8) -> EngineConfig {
    EngineConfig {
        account_index,
        api_key_index,
        ..EngineConfig::default()
    }
}

pub fn composer(config: &EngineConfig) -> Composer {
    Composer::new(Arc::new(Blake3FieldHasher), config.bounds.clone())
}

pub fn client(exchange: Arc<MockExchange>, config: EngineConfig) -> SignerClient {
    let composer = composer(&config);
    let nonces = Arc::new(NonceCoordinator::new(exchange.clone()));
    SignerClient::new(
        config,
        composer,
        nonces,
        exchange.clone(),
        exchange,
        Arc::new(StubSigner::default()),
    )
}
