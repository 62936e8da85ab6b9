// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cache-aside layer over the key-value store.
//!
//! Every store failure is absorbed here: a failed or unreadable read is a
//! miss, a failed write or delete is logged and counted. Callers only ever
//! see their own compute errors, and only when no last-known-good copy of
//! the value exists.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::StoreError;
use crate::keys::{CacheFamily, CacheKey};
use crate::metrics::{CacheOutcome, Metrics};
use crate::store::StoreClient;

/// What a single-flight leader hands to the callers waiting on it.
type Shared = Option<Arc<dyn Any + Send + Sync>>;

#[derive(Serialize)]
struct EnvelopeOut<'a, V> {
    v: u32,
    cached_at: DateTime<Utc>,
    value: &'a V,
}

#[derive(Deserialize)]
struct EnvelopeIn<V> {
    v: u32,
    value: V,
}

/// Per-family time-to-live settings.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub document: Duration,
    pub recent: Duration,
    pub views: Duration,
    pub stale: Duration,
}

impl CacheTtls {
    pub fn for_family(&self, family: CacheFamily) -> Duration {
        match family {
            CacheFamily::Document => self.document,
            CacheFamily::Recent => self.recent,
            CacheFamily::Views => self.views,
        }
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            document: Duration::from_secs(config.document_ttl_secs),
            recent: Duration::from_secs(config.recent_ttl_secs),
            views: Duration::from_secs(config.views_ttl_secs),
            stale: Duration::from_secs(config.stale_ttl_secs),
        }
    }
}

/// Store expiries are whole seconds; round up so nothing expires early.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Cache-aside store.
pub struct CacheStore {
    store: Arc<dyn StoreClient>,
    metrics: Arc<Metrics>,
    ttls: CacheTtls,
    single_flight: bool,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Shared>>>>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn StoreClient>, config: &CacheConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            metrics,
            ttls: CacheTtls::from(config),
            single_flight: config.single_flight,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl_for(&self, family: CacheFamily) -> Duration {
        self.ttls.for_family(family)
    }

    /// Read a cached value. Absent, expired, unreadable, wrong-version and
    /// store-failure cases all come back as `None`.
    pub async fn fetch<V: DeserializeOwned>(&self, key: &CacheKey) -> Option<V> {
        let family = key.family();
        match self.read::<V>(&key.to_string(), family).await {
            Ok(Some(value)) => {
                self.metrics.record_cache(family, CacheOutcome::Hit);
                Some(value)
            }
            Ok(None) => {
                self.metrics.record_cache(family, CacheOutcome::Miss);
                None
            }
            Err(()) => {
                self.metrics.record_cache(family, CacheOutcome::Error);
                None
            }
        }
    }

    /// Write a value under `key` and refresh its last-known-good copy.
    /// `ttl` defaults to the family's configured TTL.
    pub async fn store<V: Serialize>(&self, key: &CacheKey, value: &V, ttl: Option<Duration>) {
        let family = key.family();
        let envelope = EnvelopeOut {
            v: family.format_version(),
            cached_at: Utc::now(),
            value,
        };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache value");
                return;
            }
        };

        let ttl = ttl.unwrap_or_else(|| self.ttl_for(family));
        self.write(&key.to_string(), bytes.clone(), ttl).await;
        self.write(&key.stale(), bytes, self.ttls.stale).await;
    }

    /// Return the cached value for `key`, or run `compute`, cache a present
    /// result and return it.
    ///
    /// `Ok(None)` from `compute` is returned as-is and not cached. When
    /// `compute` fails and a last-known-good copy exists, that copy is
    /// served instead of the error.
    pub async fn get_or_compute<V, F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
        E: Display,
    {
        if let Some(value) = self.fetch(key).await {
            return Ok(Some(value));
        }

        let outcome = if self.single_flight {
            self.compute_shared(key, ttl, compute).await
        } else {
            self.compute_and_store(key, ttl, compute).await
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(e) => {
                let family = key.family();
                match self.read::<V>(&key.stale(), family).await {
                    Ok(Some(stale)) => {
                        warn!(key = %key, error = %e, "Recompute failed, serving stale value");
                        self.metrics.record_cache(family, CacheOutcome::Stale);
                        Ok(Some(stale))
                    }
                    _ => Err(e),
                }
            }
        }
    }

    /// Drop the entry for one entity, every known variant of it, and the
    /// same entity's entries in derived families. Last-known-good copies
    /// are left in place.
    pub async fn invalidate(&self, family: CacheFamily, entity_id: &str) {
        let base = CacheKey::new(family, entity_id);
        self.remove(&base.to_string()).await;
        for variant in family.variants() {
            self.remove(&base.clone().with_variant(variant).to_string())
                .await;
        }

        for derived in family.derived() {
            self.remove(&CacheKey::new(*derived, entity_id).to_string())
                .await;
        }
    }

    /// Drop every entry of a family that has an enumerable key set.
    pub async fn invalidate_family(&self, family: CacheFamily) {
        match family.fixed_entity() {
            Some(entity_id) => self.invalidate(family, entity_id).await,
            None => {
                debug!(family = %family, "Family has no enumerable keys, leaving entries to expire");
            }
        }
    }

    async fn compute_and_store<V, F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let value = compute().await?;
        if let Some(value) = &value {
            self.store(key, value, ttl).await;
        }
        Ok(value)
    }

    /// Run `compute` at most once per key across concurrent callers. The
    /// rest wait for the leader and take its result. When the leader fails
    /// the cell stays empty and the next waiter computes on its own.
    async fn compute_shared<V, F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Option<V>, E>
    where
        V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let flight_key = key.to_string();
        let cell = self.join_flight(&flight_key);

        let result = cell
            .get_or_try_init(move || async move {
                // A previous leader may have filled the cache while this
                // caller was between its miss and joining the flight.
                if let Ok(Some(value)) = self.read::<V>(&flight_key, key.family()).await {
                    return Ok::<Shared, E>(Some(Arc::new(value) as Arc<dyn Any + Send + Sync>));
                }
                let value = self.compute_and_store(key, ttl, compute).await?;
                Ok::<Shared, E>(value.map(|v| Arc::new(v) as Arc<dyn Any + Send + Sync>))
            })
            .await
            .map(Clone::clone);

        self.leave_flight(&key.to_string(), &cell);

        match result? {
            None => Ok(None),
            Some(shared) => match shared.downcast_ref::<V>() {
                Some(value) => Ok(Some(value.clone())),
                None => {
                    warn!(key = %key, "Shared value has an unexpected type");
                    Ok(None)
                }
            },
        }
    }

    fn join_flight(&self, flight_key: &str) -> Arc<OnceCell<Shared>> {
        let mut flights = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        flights
            .entry(flight_key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Waiters keep their own handle on the cell, so the entry can go as
    /// soon as its leader is done, successful or not.
    fn leave_flight(&self, flight_key: &str, cell: &Arc<OnceCell<Shared>>) {
        let mut flights = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if flights
            .get(flight_key)
            .map_or(false, |current| Arc::ptr_eq(current, cell))
        {
            flights.remove(flight_key);
        }
    }

    /// `Err(())` marks a store failure or unreadable entry, already logged.
    async fn read<V: DeserializeOwned>(
        &self,
        raw_key: &str,
        family: CacheFamily,
    ) -> Result<Option<V>, ()> {
        let bytes = match self.store.get(raw_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.store_failed("get", raw_key, &e);
                return Err(());
            }
        };

        match serde_json::from_slice::<EnvelopeIn<V>>(&bytes) {
            Ok(envelope) if envelope.v == family.format_version() => Ok(Some(envelope.value)),
            Ok(envelope) => {
                debug!(key = %raw_key, found = envelope.v, "Cache entry has an old format version");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %raw_key, error = %e, "Unreadable cache entry");
                Err(())
            }
        }
    }

    async fn write(&self, raw_key: &str, bytes: Vec<u8>, ttl: Duration) {
        if let Err(e) = self.store.put(raw_key, bytes, ttl_secs(ttl)).await {
            self.store_failed("put", raw_key, &e);
        }
    }

    async fn remove(&self, raw_key: &str) {
        if let Err(e) = self.store.delete(raw_key).await {
            self.store_failed("delete", raw_key, &e);
        }
    }

    fn store_failed(&self, op: &'static str, raw_key: &str, error: &StoreError) {
        self.metrics.record_store_error(op);
        match error {
            StoreError::Disabled => debug!(op, key = %raw_key, "Store disabled"),
            _ => warn!(op, key = %raw_key, error = %error, "Store call failed"),
        }
    }
}
