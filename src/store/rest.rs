// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Redis-over-HTTP store client.
//!
//! Speaks the REST command protocol offered by hosted Redis services: each
//! command is a JSON array POSTed to the base URL with a bearer token, and
//! the reply is `{"result": ...}` or `{"error": "..."}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::StoreClient;
use crate::error::StoreError;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// REST store client
pub struct RestStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl RestStore {
    /// Create a new client with a per-request timeout
    pub fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    async fn command(&self, args: Vec<String>) -> Result<Value, StoreError> {
        debug!(command = %args.first().map(String::as_str).unwrap_or(""), "Store command");

        let mut request = self.client.post(&self.base_url).json(&args);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(StoreError::Unavailable(format!("store returned {}", status)));
        }

        let reply: Reply = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Protocol(error));
        }
        if !status.is_success() {
            return Err(StoreError::Protocol(format!("store returned {}", status)));
        }

        Ok(reply.result)
    }
}

fn set_command(key: &str, value: String, ttl_secs: u64) -> Vec<String> {
    let mut args = vec!["SET".to_string(), key.to_string(), value];
    if ttl_secs > 0 {
        args.push("EX".to_string());
        args.push(ttl_secs.to_string());
    }
    args
}

/// Integer replies arrive as JSON numbers or, from some services, strings.
fn integer_reply(value: &Value) -> Result<i64, StoreError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| StoreError::Protocol(format!("integer out of range: {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| StoreError::Protocol(format!("not an integer: {}", s))),
        other => Err(StoreError::Protocol(format!("not an integer: {}", other))),
    }
}

#[async_trait]
impl StoreClient for RestStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.command(vec!["GET".to_string(), key.to_string()]).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.into_bytes())),
            other => Err(StoreError::Protocol(format!("unexpected GET reply: {}", other))),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError> {
        let text = String::from_utf8(value)
            .map_err(|_| StoreError::Protocol("value is not UTF-8".to_string()))?;
        self.command(set_command(key, text, ttl_secs)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.command(vec!["DEL".to_string(), key.to_string()]).await?;
        Ok(())
    }

    async fn increment(
        &self,
        key: &str,
        amount: i64,
        ttl_secs_if_new: u64,
    ) -> Result<i64, StoreError> {
        let reply = self
            .command(vec![
                "INCRBY".to_string(),
                key.to_string(),
                amount.to_string(),
            ])
            .await?;
        let value = integer_reply(&reply)?;

        // The key was created by this call.
        if value == amount && ttl_secs_if_new > 0 {
            let expire = vec![
                "EXPIRE".to_string(),
                key.to_string(),
                ttl_secs_if_new.to_string(),
            ];
            if let Err(e) = self.command(expire).await {
                warn!(key = %key, error = %e, "Failed to set expiry on new counter");
            }
        }

        Ok(value)
    }
}
