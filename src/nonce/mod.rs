//! Nonce coordinator
//!
//! Optimistic per-identity sequencing. The first allocation for an identity
//! fetches the server baseline; after that, allocation is a counter bump under
//! that identity's own lock. Identities never contend with each other.
//!
//! Only the most recently issued nonce can be reclaimed on failure, and never
//! one issued before the last resync. An older failure leaves a gap that
//! persists until [`NonceCoordinator::resync`].

use crate::error::NonceDesyncError;
use crate::transport::NonceSource;
use crate::tx::Identity;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Local view of one identity's sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NonceRecord {
    /// Last value fetched from the server
    pub confirmed_baseline: i64,
    /// Next value [`NonceCoordinator::allocate`] will return
    pub next_local: i64,
    /// Allocations not yet acknowledged either way
    pub in_flight: u64,
}

impl NonceRecord {
    fn seeded(baseline: i64) -> Self {
        Self {
            confirmed_baseline: baseline,
            next_local: baseline,
            in_flight: 0,
        }
    }
}

/// `None` until the baseline has been fetched.
type Slot = Arc<Mutex<Option<NonceRecord>>>;

pub struct NonceCoordinator {
    source: Arc<dyn NonceSource>,
    slots: RwLock<HashMap<Identity, Slot>>,
}

impl std::fmt::Debug for NonceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceCoordinator").finish_non_exhaustive()
    }
}

impl NonceCoordinator {
    pub fn new(source: Arc<dyn NonceSource>) -> Self {
        Self {
            source,
            slots: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, identity: Identity) -> Slot {
        if let Some(slot) = self.slots.read().await.get(&identity) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(identity)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    async fn existing_slot(&self, identity: Identity) -> Option<Slot> {
        self.slots.read().await.get(&identity).cloned()
    }

    async fn fetch(&self, identity: Identity) -> Result<i64, NonceDesyncError> {
        self.source
            .fetch_nonce(identity)
            .await
            .map_err(|source| NonceDesyncError { identity, source })
    }

    /// Issue the next nonce for `identity`.
    ///
    /// Blocks on the network only for the first call per identity. If that
    /// fetch fails the identity stays uninitialized and the next call retries.
    pub async fn allocate(&self, identity: Identity) -> Result<i64, NonceDesyncError> {
        let slot = self.slot(identity).await;
        let mut guard = slot.lock().await;

        let mut record = match *guard {
            Some(record) => record,
            None => {
                let baseline = self.fetch(identity).await?;
                debug!(
                    account_index = identity.account_index,
                    api_key_index = identity.api_key_index,
                    baseline,
                    "nonce slot initialized"
                );
                NonceRecord::seeded(baseline)
            }
        };

        let nonce = record.next_local;
        record.next_local += 1;
        record.in_flight += 1;
        *guard = Some(record);

        debug!(
            account_index = identity.account_index,
            api_key_index = identity.api_key_index,
            nonce,
            in_flight = record.in_flight,
            "allocated nonce"
        );
        Ok(nonce)
    }

    /// The exchange accepted `nonce`. The counter already moved past it.
    pub async fn acknowledge_success(&self, identity: Identity, nonce: i64) {
        let Some(slot) = self.existing_slot(identity).await else {
            warn!(%identity, nonce, "success acknowledged for unknown identity");
            return;
        };
        let mut guard = slot.lock().await;
        if let Some(record) = guard.as_mut() {
            record.in_flight = record.in_flight.saturating_sub(1);
        }
    }

    /// Submission of `nonce` failed. Reclaims it only if it was the most
    /// recently issued value and is not below the confirmed baseline.
    pub async fn acknowledge_failure(&self, identity: Identity, nonce: i64) {
        let Some(slot) = self.existing_slot(identity).await else {
            warn!(%identity, nonce, "failure acknowledged for unknown identity");
            return;
        };
        let mut guard = slot.lock().await;
        let Some(record) = guard.as_mut() else {
            return;
        };

        record.in_flight = record.in_flight.saturating_sub(1);
        // Nonces below the baseline were issued before a resync.
        if nonce == record.next_local - 1 && nonce >= record.confirmed_baseline {
            record.next_local = nonce;
            debug!(
                account_index = identity.account_index,
                api_key_index = identity.api_key_index,
                nonce,
                "reclaimed nonce after failed submission"
            );
        } else {
            warn!(
                account_index = identity.account_index,
                api_key_index = identity.api_key_index,
                nonce,
                next_local = record.next_local,
                confirmed_baseline = record.confirmed_baseline,
                "failed nonce is not reclaimable; gap remains until resync"
            );
        }
    }

    /// Re-fetch the server baseline and reset the local counter to it,
    /// discarding in-flight bookkeeping. On failure the previous state is
    /// kept.
    pub async fn resync(&self, identity: Identity) -> Result<i64, NonceDesyncError> {
        let slot = self.slot(identity).await;
        let mut guard = slot.lock().await;

        match self.fetch(identity).await {
            Ok(baseline) => {
                if let Some(previous) = *guard {
                    if previous.next_local != baseline {
                        info!(
                            account_index = identity.account_index,
                            api_key_index = identity.api_key_index,
                            local = previous.next_local,
                            server = baseline,
                            dropped_in_flight = previous.in_flight,
                            "nonce resynced to server baseline"
                        );
                    }
                }
                *guard = Some(NonceRecord::seeded(baseline));
                Ok(baseline)
            }
            Err(err) => {
                warn!(
                    account_index = identity.account_index,
                    api_key_index = identity.api_key_index,
                    error = %err.source,
                    "nonce resync failed; keeping previous state"
                );
                Err(err)
            }
        }
    }

    /// Resync every identity seen so far, concurrently.
    pub async fn resync_all(&self) -> Vec<(Identity, Result<i64, NonceDesyncError>)> {
        let identities: Vec<Identity> = self.slots.read().await.keys().copied().collect();
        let results = join_all(identities.iter().map(|id| self.resync(*id))).await;
        identities.into_iter().zip(results).collect()
    }

    /// Current record for `identity`, `None` if never initialized.
    pub async fn snapshot(&self, identity: Identity) -> Option<NonceRecord> {
        let slot = self.existing_slot(identity).await?;
        let guard = slot.lock().await;
        *guard
    }
}
