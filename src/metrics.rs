// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the cache, the store, the rate governor and
//! the sanitizer. Each `Metrics` owns its own registry, so tests and
//! multiple instances never share counters.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::keys::CacheFamily;
use crate::sanitizer::SanitizeReport;

/// Outcome of a cache read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    /// Recomputation failed and a last-known-good value was served
    Stale,
    /// The store failed or held an unreadable value
    Error,
}

impl CacheOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Stale => "stale",
            Self::Error => "error",
        }
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Allowed,
    Limited,
    /// The store was unavailable and the request was admitted anyway
    FailOpen,
}

impl AdmissionOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Limited => "limited",
            Self::FailOpen => "fail_open",
        }
    }
}

/// Service metrics.
pub struct Metrics {
    registry: Registry,
    cache_requests: IntCounterVec,
    store_errors: IntCounterVec,
    rate_limit_decisions: IntCounterVec,
    sanitizer_removals: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cache_requests = IntCounterVec::new(
            Opts::new("sharegate_cache_requests_total", "Cache reads by family and outcome"),
            &["family", "outcome"],
        )?;
        let store_errors = IntCounterVec::new(
            Opts::new("sharegate_store_errors_total", "Backing store failures by operation"),
            &["op"],
        )?;
        let rate_limit_decisions = IntCounterVec::new(
            Opts::new(
                "sharegate_rate_limit_decisions_total",
                "Admission decisions by policy and outcome",
            ),
            &["policy", "outcome"],
        )?;
        let sanitizer_removals = IntCounterVec::new(
            Opts::new("sharegate_sanitizer_removals_total", "Content removed by the sanitizer"),
            &["kind"],
        )?;

        registry.register(Box::new(cache_requests.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;
        registry.register(Box::new(rate_limit_decisions.clone()))?;
        registry.register(Box::new(sanitizer_removals.clone()))?;

        Ok(Self {
            registry,
            cache_requests,
            store_errors,
            rate_limit_decisions,
            sanitizer_removals,
        })
    }

    pub fn record_cache(&self, family: CacheFamily, outcome: CacheOutcome) {
        self.cache_requests
            .with_label_values(&[family.name(), outcome.as_str()])
            .inc();
    }

    pub fn cache_count(&self, family: CacheFamily, outcome: CacheOutcome) -> u64 {
        self.cache_requests
            .with_label_values(&[family.name(), outcome.as_str()])
            .get()
    }

    pub fn record_store_error(&self, op: &str) {
        self.store_errors.with_label_values(&[op]).inc();
    }

    pub fn store_error_count(&self, op: &str) -> u64 {
        self.store_errors.with_label_values(&[op]).get()
    }

    pub fn record_admission(&self, policy: &str, outcome: AdmissionOutcome) {
        self.rate_limit_decisions
            .with_label_values(&[policy, outcome.as_str()])
            .inc();
    }

    pub fn admission_count(&self, policy: &str, outcome: AdmissionOutcome) -> u64 {
        self.rate_limit_decisions
            .with_label_values(&[policy, outcome.as_str()])
            .get()
    }

    pub fn record_sanitize(&self, report: &SanitizeReport) {
        let kinds = [
            ("external_script", report.external_removed),
            ("inline_script", report.inline_removed),
            ("event_handler", report.handlers_stripped),
            ("javascript_scheme", report.schemes_stripped),
            ("meta_refresh", report.meta_refresh_stripped),
        ];
        for (kind, count) in kinds {
            if count > 0 {
                self.sanitizer_removals
                    .with_label_values(&[kind])
                    .inc_by(count as u64);
            }
        }
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
