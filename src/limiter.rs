// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate governor.
//!
//! Each subject gets one counter per window, keyed by the window's start
//! instant and left to expire in the store. The counter is incremented
//! before the limit is compared, so concurrent callers cannot both take the
//! last slot.
//!
//! A fixed window admits up to twice the limit across a window boundary.
//! That edge burst is accepted in exchange for one store round trip per
//! decision.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RatePolicy;
use crate::keys::rate_limit_key;
use crate::metrics::{AdmissionOutcome, Metrics};
use crate::store::StoreClient;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// End of the current window
    pub reset_at: DateTime<Utc>,
    /// The store could not be reached and the request was admitted blind
    pub degraded: bool,
}

impl Admission {
    /// Time until the window resets, zero once it has.
    pub fn retry_after(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    fn outcome(&self) -> AdmissionOutcome {
        if self.degraded {
            AdmissionOutcome::FailOpen
        } else if self.allowed {
            AdmissionOutcome::Allowed
        } else {
            AdmissionOutcome::Limited
        }
    }
}

/// Start of the window containing `now_ms`.
fn window_start_ms(now_ms: i64, window_ms: i64) -> i64 {
    now_ms.div_euclid(window_ms) * window_ms
}

/// Window length in whole seconds, rounded up, for the counter expiry.
fn window_ttl_secs(window_ms: i64) -> u64 {
    ((window_ms + 999) / 1000).max(1) as u64
}

fn instant_at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Store-backed fixed-window rate governor.
#[derive(Clone)]
pub struct RateGovernor {
    store: Arc<dyn StoreClient>,
    metrics: Option<Arc<Metrics>>,
}

impl RateGovernor {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Check a named policy for a subject and record the decision.
    pub async fn check(&self, policy_name: &str, policy: &RatePolicy, subject: &str) -> Admission {
        let admission = self.admit(subject, policy.limit, policy.window()).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_admission(policy_name, admission.outcome());
        }
        if !admission.allowed {
            debug!(policy = policy_name, subject, reset_at = %admission.reset_at, "Rate limit exceeded");
        }
        admission
    }

    /// Admit or reject one request from `subject`.
    pub async fn admit(&self, subject: &str, limit: u32, window: Duration) -> Admission {
        self.admit_at(subject, limit, window, Utc::now()).await
    }

    /// [`RateGovernor::admit`] against an explicit clock reading.
    pub async fn admit_at(
        &self,
        subject: &str,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Admission {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX).max(1);
        let start_ms = window_start_ms(now.timestamp_millis(), window_ms);
        let reset_at = instant_at(start_ms.saturating_add(window_ms));
        let key = rate_limit_key(subject, start_ms);

        match self
            .store
            .increment(&key, 1, window_ttl_secs(window_ms))
            .await
        {
            Ok(count) => {
                let used = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
                Admission {
                    allowed: used <= limit,
                    remaining: limit.saturating_sub(used),
                    reset_at,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(subject, error = %e, "Rate limit store unavailable, admitting request");
                Admission {
                    allowed: true,
                    remaining: limit,
                    reset_at,
                    degraded: true,
                }
            }
        }
    }
}
