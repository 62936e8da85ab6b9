// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process store with per-key expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::StoreClient;
use crate::error::StoreError;

#[derive(Debug)]
struct Slot {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

fn expiry(now: Instant, ttl_secs: u64) -> Option<Instant> {
    (ttl_secs > 0).then(|| now + Duration::from_secs(ttl_secs))
}

/// Thread-safe in-memory store.
///
/// Expired entries are invisible to reads immediately and reclaimed by
/// [`MemoryStore::purge_expired`]. Counters are kept as decimal text, so a
/// counter key can also be read with `get`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| slot.is_live(now));
        let removed = before - slots.len();
        if removed > 0 {
            debug!(removed, "Purged expired store entries");
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let slots = self.slots.read().await;
        let now = Instant::now();
        Ok(slots
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError> {
        let now = Instant::now();
        self.slots.write().await.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: expiry(now, ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.slots.write().await.remove(key);
        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        amount: i64,
        ttl_secs_if_new: u64,
    ) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut slots = self.slots.write().await;

        if let Some(slot) = slots.get_mut(key).filter(|slot| slot.is_live(now)) {
            let current = std::str::from_utf8(&slot.value)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or_else(|| {
                    StoreError::Protocol(format!("value at {} is not an integer", key))
                })?;
            let next = current.saturating_add(amount);
            slot.value = next.to_string().into_bytes();
            return Ok(next);
        }

        slots.insert(
            key.to_string(),
            Slot {
                value: amount.to_string().into_bytes(),
                expires_at: expiry(now, ttl_secs_if_new),
            },
        );
        Ok(amount)
    }
}
