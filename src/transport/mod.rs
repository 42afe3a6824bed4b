//! Exchange collaborators
//!
//! The engine never talks to the network directly. It consumes these traits,
//! and [`HttpTransport`] implements all of them against the REST API.

mod http;

pub use http::HttpTransport;

use crate::compose::SignedTransaction;
use crate::error::TransportError;
use crate::tx::Identity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of the server's confirmed nonce baseline
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Next nonce the server expects for `identity`.
    async fn fetch_nonce(&self, identity: Identity) -> Result<i64, TransportError>;
}

/// Accepts fully signed transactions
#[async_trait]
pub trait TxSubmitter: Send + Sync {
    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResponse, TransportError>;

    /// Submit several transactions in one request. Order is preserved.
    async fn submit_batch(
        &self,
        signed: &[SignedTransaction],
    ) -> Result<BatchSubmitResponse, TransportError>;
}

/// Top of book, used to bound slippage-protected market orders
#[async_trait]
pub trait ReferencePriceSource: Send + Sync {
    /// Best ask when buying, best bid when selling, as the exchange prints it.
    async fn fetch_reference_price(
        &self,
        market_index: i16,
        is_buy: bool,
    ) -> Result<String, TransportError>;
}

/// Exchange reply to `sendTx`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Exchange reply to `sendTxBatch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmitResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tx_hash: Vec<String>,
}

/// Success code used by every exchange endpoint
pub const CODE_OK: i64 = 200;

impl SubmitResponse {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

impl BatchSubmitResponse {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}
