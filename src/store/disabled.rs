// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

use async_trait::async_trait;

use super::StoreClient;
use crate::error::StoreError;

/// A store that refuses every call.
///
/// Running with this backend turns the cache into a pass-through and the
/// rate governor into an always-admit gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

#[async_trait]
impl StoreClient for DisabledStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Disabled)
    }

    async fn put(&self, _key: &str, _value: Vec<u8>, _ttl_secs: u64) -> Result<(), StoreError> {
        Err(StoreError::Disabled)
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Disabled)
    }

    async fn increment(
        &self,
        _key: &str,
        _amount: i64,
        _ttl_secs_if_new: u64,
    ) -> Result<i64, StoreError> {
        Err(StoreError::Disabled)
    }
}
