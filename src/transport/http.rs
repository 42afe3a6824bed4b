//! REST transport over reqwest

use super::{
    BatchSubmitResponse, NonceSource, ReferencePriceSource, SubmitResponse, TxSubmitter, CODE_OK,
};
use crate::compose::SignedTransaction;
use crate::error::TransportError;
use crate::tx::Identity;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the exchange API rooted at `base_url`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    price_protection: bool,
}

#[derive(Debug, Deserialize)]
struct NextNonceResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    nonce: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PriceLevel {
    price: String,
}

#[derive(Debug, Deserialize)]
struct OrderBookOrdersResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    asks: Vec<PriceLevel>,
    #[serde(default)]
    bids: Vec<PriceLevel>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            price_protection: true,
        }
    }

    /// Toggle the exchange-side fat-finger check sent with each submission.
    pub fn with_price_protection(mut self, enabled: bool) -> Self {
        self.price_protection = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the body as text and decode it, surfacing HTTP failures with
    /// whatever message the server returned.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Api {
                code: status.as_u16() as i64,
                message: body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn check_code(code: i64, message: Option<String>) -> Result<(), TransportError> {
    if code == CODE_OK {
        Ok(())
    } else {
        Err(TransportError::Api {
            code,
            message: message.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl NonceSource for HttpTransport {
    async fn fetch_nonce(&self, identity: Identity) -> Result<i64, TransportError> {
        let response = self
            .client
            .get(self.url("/api/v1/nextNonce"))
            .query(&[
                ("account_index", identity.account_index.to_string()),
                ("api_key_index", identity.api_key_index.to_string()),
            ])
            .send()
            .await?;

        let parsed: NextNonceResponse = Self::decode(response).await?;
        check_code(parsed.code, parsed.message)?;
        let nonce = parsed
            .nonce
            .ok_or_else(|| TransportError::Unavailable("nextNonce reply had no nonce".into()))?;

        debug!(
            account_index = identity.account_index,
            api_key_index = identity.api_key_index,
            nonce,
            "fetched nonce baseline"
        );
        Ok(nonce)
    }
}

#[async_trait]
impl TxSubmitter for HttpTransport {
    async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResponse, TransportError> {
        let tx_type = signed.kind().as_u8().to_string();
        let tx_info = signed.tx_info()?;
        let price_protection = self.price_protection.to_string();

        let response = self
            .client
            .post(self.url("/api/v1/sendTx"))
            .form(&[
                ("tx_type", tx_type.as_str()),
                ("tx_info", tx_info.as_str()),
                ("price_protection", price_protection.as_str()),
            ])
            .send()
            .await?;

        let parsed: SubmitResponse = Self::decode(response).await?;
        if !parsed.is_ok() {
            warn!(
                kind = %signed.kind(),
                nonce = signed.transaction().nonce(),
                code = parsed.code,
                "exchange rejected transaction"
            );
            check_code(parsed.code, parsed.message.clone())?;
        }
        Ok(parsed)
    }

    async fn submit_batch(
        &self,
        signed: &[SignedTransaction],
    ) -> Result<BatchSubmitResponse, TransportError> {
        let tx_types: Vec<u8> = signed.iter().map(|s| s.kind().as_u8()).collect();
        let tx_infos = signed
            .iter()
            .map(SignedTransaction::tx_info)
            .collect::<Result<Vec<_>, _>>()?;

        let tx_types = serde_json::to_string(&tx_types)?;
        let tx_infos = serde_json::to_string(&tx_infos)?;

        let response = self
            .client
            .post(self.url("/api/v1/sendTxBatch"))
            .form(&[("tx_types", tx_types.as_str()), ("tx_infos", tx_infos.as_str())])
            .send()
            .await?;

        let parsed: BatchSubmitResponse = Self::decode(response).await?;
        if !parsed.is_ok() {
            warn!(count = signed.len(), code = parsed.code, "exchange rejected batch");
            check_code(parsed.code, parsed.message.clone())?;
        }
        Ok(parsed)
    }
}

#[async_trait]
impl ReferencePriceSource for HttpTransport {
    async fn fetch_reference_price(
        &self,
        market_index: i16,
        is_buy: bool,
    ) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.url("/api/v1/orderBookOrders"))
            .query(&[("market_id", market_index.to_string()), ("limit", "1".to_string())])
            .send()
            .await?;

        let parsed: OrderBookOrdersResponse = Self::decode(response).await?;
        check_code(parsed.code, parsed.message)?;

        let side = if is_buy { parsed.asks } else { parsed.bids };
        side.into_iter()
            .next()
            .map(|level| level.price)
            .ok_or_else(|| {
                TransportError::Unavailable(format!("no liquidity in order book {}", market_index))
            })
    }
}
