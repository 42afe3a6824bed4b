//! Signer client
//!
//! Orchestrates one submission end to end:
//! build and validate → allocate nonce → finalize signatures → submit →
//! acknowledge the nonce either way.
//!
//! Validation runs before allocation, so a rejected request never consumes a
//! nonce. Any failure after allocation acknowledges the nonce as failed.

use crate::compose::{Composer, SignedTransaction};
use crate::config::EngineConfig;
use crate::crypto::{ExternalSigner, FieldHasher, LocalSigner};
use crate::error::{SigningError, ValidationError, Violation};
use crate::nonce::NonceCoordinator;
use crate::transport::{
    BatchSubmitResponse, HttpTransport, ReferencePriceSource, SubmitResponse, TxSubmitter,
};
use crate::tx::{build_and_validate, Identity, OrderIntent, OrderRequest, TxDraft, TxKind, TxRequest};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SignerClient {
    config: EngineConfig,
    composer: Composer,
    nonces: Arc<NonceCoordinator>,
    submitter: Arc<dyn TxSubmitter>,
    prices: Arc<dyn ReferencePriceSource>,
    local: Arc<dyn LocalSigner>,
    external: Option<Arc<dyn ExternalSigner>>,
}

impl std::fmt::Debug for SignerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerClient")
            .field("identity", &self.identity())
            .field("chain_id", &self.config.resolved_chain_id())
            .field("external_signer", &self.external.as_ref().map(|s| s.address()))
            .finish_non_exhaustive()
    }
}

impl SignerClient {
    pub fn new(
        config: EngineConfig,
        composer: Composer,
        nonces: Arc<NonceCoordinator>,
        submitter: Arc<dyn TxSubmitter>,
        prices: Arc<dyn ReferencePriceSource>,
        local: Arc<dyn LocalSigner>,
    ) -> Self {
        Self {
            config,
            composer,
            nonces,
            submitter,
            prices,
            local,
            external: None,
        }
    }

    /// Client wired to the REST API at the configured endpoint.
    pub fn over_http(
        config: EngineConfig,
        hasher: Arc<dyn FieldHasher>,
        local: Arc<dyn LocalSigner>,
    ) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.resolved_api_url())?);
        let composer = Composer::new(hasher, config.bounds.clone());
        let nonces = Arc::new(NonceCoordinator::new(transport.clone()));
        Ok(Self::new(
            config,
            composer,
            nonces,
            transport.clone(),
            transport,
            local,
        ))
    }

    /// Attach the L1 key used for transfers and key rotation.
    pub fn with_external_signer(mut self, signer: Arc<dyn ExternalSigner>) -> Self {
        self.external = Some(signer);
        self
    }

    pub fn identity(&self) -> Identity {
        self.config.identity()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn nonces(&self) -> &Arc<NonceCoordinator> {
        &self.nonces
    }

    fn expired_at(&self) -> i64 {
        Utc::now().timestamp_millis() + self.config.tx_ttl_ms
    }

    fn default_order_expiry(&self) -> i64 {
        Utc::now().timestamp_millis() + self.config.order_ttl_ms
    }

    /// Fill in resting-order expiries the caller left at zero.
    fn with_order_defaults(&self, request: TxRequest) -> TxRequest {
        let expiry = self.default_order_expiry();
        let fill = |mut order: OrderRequest| {
            if order.order_expiry == 0 {
                order.order_expiry = expiry;
            }
            order
        };
        match request {
            TxRequest::CreateOrder(order) => TxRequest::CreateOrder(fill(order)),
            TxRequest::CreateGroupedOrders {
                grouping_type,
                orders,
            } => TxRequest::CreateGroupedOrders {
                grouping_type,
                orders: orders.into_iter().map(fill).collect(),
            },
            other => other,
        }
    }

    fn draft(&self, request: TxRequest) -> Result<TxDraft> {
        let request = self.with_order_defaults(request);
        let draft = build_and_validate(
            request,
            self.identity(),
            self.expired_at(),
            &self.config.bounds,
        )?;

        if draft.body().signature_requirement().needs_external() && self.external.is_none() {
            return Err(SigningError::MissingExternalSigner(draft.kind()).into());
        }
        Ok(draft)
    }

    /// Validate, allocate a nonce and sign. The nonce is acknowledged as
    /// failed if signing does not complete.
    pub async fn prepare(&self, request: TxRequest) -> Result<SignedTransaction> {
        let draft = self.draft(request)?;
        let identity = draft.identity();
        let nonce = self.nonces.allocate(identity).await?;

        let signed = draft
            .with_nonce(nonce, &self.config.bounds)
            .map_err(crate::Error::from)
            .and_then(|tx| {
                self.composer.finalize(
                    tx,
                    self.config.resolved_chain_id(),
                    self.local.as_ref(),
                    self.external.as_deref(),
                )
            });

        if signed.is_err() {
            self.nonces.acknowledge_failure(identity, nonce).await;
        }
        signed
    }

    /// Submit a prepared transaction and acknowledge its nonce.
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<SubmitResponse> {
        let identity = signed.transaction().identity();
        let nonce = signed.transaction().nonce();

        if let Err(err) = self.composer.ensure_digest(signed) {
            self.nonces.acknowledge_failure(identity, nonce).await;
            return Err(err.into());
        }

        match self.submitter.submit(signed).await {
            Ok(response) => {
                self.nonces.acknowledge_success(identity, nonce).await;
                info!(
                    kind = %signed.kind(),
                    account_index = identity.account_index,
                    nonce,
                    tx_hash = %signed.tx_hash(),
                    "transaction submitted"
                );
                Ok(response)
            }
            Err(err) => {
                self.nonces.acknowledge_failure(identity, nonce).await;
                warn!(kind = %signed.kind(), nonce, error = %err, "submission failed");
                Err(err.into())
            }
        }
    }

    /// Prepare and submit in one call.
    pub async fn send(&self, request: TxRequest) -> Result<SubmitResponse> {
        let signed = self.prepare(request).await?;
        self.submit(&signed).await
    }

    /// Prepare every request, then submit them as one batch. If anything
    /// fails, nonces are acknowledged newest first so all of them can be
    /// reclaimed.
    pub async fn send_batch(&self, requests: Vec<TxRequest>) -> Result<BatchSubmitResponse> {
        let mut prepared: Vec<SignedTransaction> = Vec::with_capacity(requests.len());
        for request in requests {
            match self.prepare(request).await {
                Ok(signed) => prepared.push(signed),
                Err(err) => {
                    self.fail_all(&prepared).await;
                    return Err(err);
                }
            }
        }

        for signed in &prepared {
            if let Err(err) = self.composer.ensure_digest(signed) {
                self.fail_all(&prepared).await;
                return Err(err.into());
            }
        }

        match self.submitter.submit_batch(&prepared).await {
            Ok(response) => {
                for signed in &prepared {
                    let tx = signed.transaction();
                    self.nonces.acknowledge_success(tx.identity(), tx.nonce()).await;
                }
                info!(count = prepared.len(), "batch submitted");
                Ok(response)
            }
            Err(err) => {
                self.fail_all(&prepared).await;
                warn!(count = prepared.len(), error = %err, "batch submission failed");
                Err(err.into())
            }
        }
    }

    async fn fail_all(&self, prepared: &[SignedTransaction]) {
        for signed in prepared.iter().rev() {
            let tx = signed.transaction();
            self.nonces.acknowledge_failure(tx.identity(), tx.nonce()).await;
        }
    }

    /// Market order bounded by `slippage_bps` around the current top of book,
    /// sent as an immediate-or-cancel limit.
    pub async fn create_market_order_with_slippage(
        &self,
        market_index: i16,
        base_amount: i64,
        is_buy: bool,
        slippage_bps: u32,
    ) -> Result<SubmitResponse> {
        if slippage_bps > self.config.max_slippage_bps {
            return Err(ValidationError::new(
                TxKind::CreateOrder,
                "slippage_bps",
                Violation::OutOfRange {
                    value: slippage_bps as i128,
                    min: 0,
                    max: self.config.max_slippage_bps as i128,
                },
            )
            .into());
        }

        let reference_price = self
            .prices
            .fetch_reference_price(market_index, is_buy)
            .await?;

        self.send(TxRequest::CreateOrder(OrderRequest {
            market_index,
            client_order_index: 0,
            base_amount,
            is_buy,
            reduce_only: false,
            order_expiry: 0,
            intent: OrderIntent::MarketWithSlippage {
                reference_price,
                slippage_bps,
            },
        }))
        .await
    }

    /// Reset this client's nonce counter to the server baseline.
    pub async fn resync(&self) -> Result<i64> {
        Ok(self.nonces.resync(self.identity()).await?)
    }
}
