// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the sharegate service.
//!
//! Every section has serde defaults, so a partial file or an empty
//! environment yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::sanitizer::SanitizeMode;

/// Configuration for the sharegate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Origins allowed by CORS (default: https://localhost)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Sanitizer configuration
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// Cache family configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Backing store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Submission validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Subject identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A fixed-window admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    /// Requests admitted per window
    pub limit: u32,
    /// Window size in milliseconds
    pub window_ms: u64,
}

impl RatePolicy {
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }

    /// Get the window duration
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Policy applied to publishing (default: 10 per hour)
    #[serde(default = "default_publish_policy")]
    pub publish: RatePolicy,

    /// Policy applied to delivery; `None` leaves delivery ungoverned
    /// (default: 120 per minute)
    #[serde(default = "default_view_policy")]
    pub view: Option<RatePolicy>,
}

/// Sanitizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Trusted origin substrings for external scripts and stylesheets
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,

    /// Sanitization mode applied at publish time (default: strict)
    #[serde(default)]
    pub mode: SanitizeMode,
}

/// Cache family TTLs and behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached documents in seconds (default: 3600)
    #[serde(default = "default_document_ttl")]
    pub document_ttl_secs: u64,

    /// TTL for recent-list pages in seconds (default: 300)
    #[serde(default = "default_recent_ttl")]
    pub recent_ttl_secs: u64,

    /// TTL for view counters in seconds (default: 86400)
    #[serde(default = "default_views_ttl")]
    pub views_ttl_secs: u64,

    /// TTL for last-known-good copies used when recomputation fails
    /// (default: 604800)
    #[serde(default = "default_stale_ttl")]
    pub stale_ttl_secs: u64,

    /// Share one computation between concurrent misses on a key
    /// (default: true)
    #[serde(default = "default_true")]
    pub single_flight: bool,
}

/// Which store implementation backs the cache and the rate governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map with expiry
    #[default]
    Memory,
    /// Redis-over-HTTP REST endpoint
    Rest,
    /// Every call fails; cache degrades to misses, governor fails open
    Disabled,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rest" => Ok(Self::Rest),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Backing store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// REST endpoint base URL (rest backend only)
    #[serde(default)]
    pub rest_url: Option<String>,

    /// REST bearer token (rest backend only)
    #[serde(default, skip_serializing)]
    pub rest_token: Option<String>,

    /// Per-request timeout in milliseconds (default: 800)
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,

    /// Expired-entry purge interval for the memory backend (default: 60)
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

/// Validation configuration for submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum title length in characters (default: 200)
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,

    /// Maximum description length in characters (default: 500)
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,

    /// Maximum raw content size in bytes (default: 512 KiB)
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
}

/// Subject identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Honour X-Forwarded-For / X-Real-IP (default: false)
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://localhost".to_string()]
}

fn default_publish_policy() -> RatePolicy {
    RatePolicy::new(10, 3_600_000)
}

fn default_view_policy() -> Option<RatePolicy> {
    Some(RatePolicy::new(120, 60_000))
}

fn default_allow_list() -> Vec<String> {
    vec![
        "cdn.tailwindcss.com".to_string(),
        "cdn.jsdelivr.net".to_string(),
        "unpkg.com".to_string(),
        "fonts.googleapis.com".to_string(),
    ]
}

fn default_document_ttl() -> u64 {
    3600
}

fn default_recent_ttl() -> u64 {
    300
}

fn default_views_ttl() -> u64 {
    86_400
}

fn default_stale_ttl() -> u64 {
    7 * 86_400
}

fn default_store_timeout_ms() -> u64 {
    800
}

fn default_purge_interval() -> u64 {
    60
}

fn default_max_title_chars() -> usize {
    200
}

fn default_max_description_chars() -> usize {
    500
}

fn default_max_content_bytes() -> usize {
    512 * 1024
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: default_allowed_origins(),
            rate_limit: RateLimitConfig::default(),
            sanitizer: SanitizerConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            validation: ValidationConfig::default(),
            identity: IdentityConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            publish: default_publish_policy(),
            view: default_view_policy(),
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            mode: SanitizeMode::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            document_ttl_secs: default_document_ttl(),
            recent_ttl_secs: default_recent_ttl(),
            views_ttl_secs: default_views_ttl(),
            stale_ttl_secs: default_stale_ttl(),
            single_flight: default_true(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            rest_url: None,
            rest_token: None,
            timeout_ms: default_store_timeout_ms(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_title_chars: default_max_title_chars(),
            max_description_chars: default_max_description_chars(),
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_headers: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl StoreConfig {
    /// Get the per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the memory purge interval
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }
}
