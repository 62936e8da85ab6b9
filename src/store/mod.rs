// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Key-value store client shared by the cache and the rate governor.
//!
//! The contract is deliberately small: get, put with expiry, delete and an
//! atomic increment that sets an expiry only when it creates the key. No
//! wildcard delete is assumed.

mod disabled;
mod memory;
mod rest;

pub use disabled::DisabledStore;
pub use memory::MemoryStore;
pub use rest::RestStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;

/// Backing store contract.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Read a value, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a value that expires after `ttl_secs`.
    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically add `amount` and return the new value. The expiry is set
    /// only when this call created the key.
    async fn increment(
        &self,
        key: &str,
        amount: i64,
        ttl_secs_if_new: u64,
    ) -> Result<i64, StoreError>;
}

/// Build the store selected by configuration.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn StoreClient>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Disabled => Ok(Arc::new(DisabledStore)),
        StoreBackend::Rest => {
            let url = config.rest_url.clone().ok_or_else(|| {
                StoreError::Protocol("rest backend requires a URL".to_string())
            })?;
            let store = RestStore::new(url, config.rest_token.clone(), config.timeout())?;
            Ok(Arc::new(store))
        }
    }
}
