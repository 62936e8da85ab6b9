// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Publishing and delivery paths.
//!
//! Publishing runs governor, validation, sanitizer, durable write and cache
//! maintenance in that order. Delivery reads through the cache and counts
//! views in the repository. Only rate limiting, validation and repository
//! failures reach the caller.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::config::{Config, RateLimitConfig, RatePolicy, SanitizerConfig};
use crate::document::{derive_document_id, DocumentSummary, SharedDocument, Submission};
use crate::error::{AppError, RepositoryError, Result};
use crate::keys::{normalize_page_size, CacheFamily, CacheKey};
use crate::limiter::{Admission, RateGovernor};
use crate::metrics::Metrics;
use crate::repository::DocumentRepository;
use crate::sanitizer::{compact, sanitize_with_report};
use crate::store::StoreClient;
use crate::validator::SubmissionValidator;

const PUBLISH_POLICY: &str = "publish";
const VIEW_POLICY: &str = "view";

/// The composed publishing service.
pub struct Publisher {
    repository: Arc<dyn DocumentRepository>,
    cache: CacheStore,
    governor: RateGovernor,
    validator: SubmissionValidator,
    sanitizer: SanitizerConfig,
    policies: RateLimitConfig,
    metrics: Arc<Metrics>,
}

impl Publisher {
    /// Wire the pipeline over one store client shared by cache and governor.
    pub fn new(
        config: &Config,
        store: Arc<dyn StoreClient>,
        repository: Arc<dyn DocumentRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            cache: CacheStore::new(store.clone(), &config.cache, metrics.clone()),
            governor: RateGovernor::new(store).with_metrics(metrics.clone()),
            validator: SubmissionValidator::new(config.validation.clone()),
            sanitizer: config.sanitizer.clone(),
            policies: config.rate_limit.clone(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Accept a submission from `subject` and persist its sanitized form.
    pub async fn publish(&self, subject: &str, submission: Submission) -> Result<SharedDocument> {
        self.admit(PUBLISH_POLICY, &self.policies.publish, subject)
            .await?;
        self.validator.validate(&submission).into_result()?;

        let (mut content, report) = sanitize_with_report(
            &submission.content,
            &self.sanitizer.allow_list,
            self.sanitizer.mode,
        );
        self.metrics.record_sanitize(&report);
        if report.removals() > 0 {
            info!(
                subject,
                removed = report.removals(),
                handlers = report.handlers_stripped,
                scripts = report.external_removed + report.inline_removed,
                "Removed active content from submission"
            );
        }
        if submission.compact {
            content = compact(&content);
        }
        self.validator.validate_sanitized(&content).into_result()?;

        let now = Utc::now();
        let document = SharedDocument {
            id: derive_document_id(&content, now),
            title: submission.title.trim().to_string(),
            category: submission.category_or_default(),
            description: submission.trimmed_description(),
            content,
            is_public: submission.is_public,
            views: 0,
            compacted: submission.compact,
            sanitize_mode: self.sanitizer.mode,
            created_at: now,
            updated_at: now,
        };

        let document = self.repository.insert(document).await?;

        if document.is_public {
            self.cache.invalidate_family(CacheFamily::Recent).await;
        }
        self.cache
            .store(&CacheKey::document(&document.id), &document, None)
            .await;

        info!(
            id = %document.id,
            subject,
            category = %document.category,
            public = document.is_public,
            "Document published"
        );
        Ok(document)
    }

    /// Deliver a document to `subject`, counting the view.
    pub async fn view(&self, subject: &str, id: &str) -> Result<SharedDocument> {
        if let Some(policy) = &self.policies.view {
            self.admit(VIEW_POLICY, policy, subject).await?;
        }

        let document = self.document(id).await?;
        let views = self.repository.increment_views(id).await?;
        self.cache.store(&CacheKey::views(id), &views, None).await;

        debug!(id, views, "Document viewed");
        Ok(SharedDocument { views, ..document })
    }

    /// Read a document through the cache without counting a view.
    pub async fn document(&self, id: &str) -> Result<SharedDocument> {
        self.cache
            .get_or_compute(&CacheKey::document(id), None, || async {
                self.repository.get(id).await
            })
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Newest public documents. The page is served from the closest cached
    /// page size and cut down to `limit`.
    pub async fn recent(&self, limit: usize) -> Result<Vec<DocumentSummary>> {
        let page_size = normalize_page_size(limit);
        let wanted = if limit == 0 { page_size } else { limit.min(page_size) };

        let mut summaries = self
            .cache
            .get_or_compute(&CacheKey::recent(page_size), None, || async {
                self.repository
                    .recent_public(page_size)
                    .await
                    .map(Some)
            })
            .await?
            .unwrap_or_default();
        summaries.truncate(wanted);
        Ok(summaries)
    }

    /// Last known view count, served from the cache when possible.
    pub async fn view_count(&self, id: &str) -> Result<u64> {
        self.cache
            .get_or_compute(&CacheKey::views(id), None, || async {
                let document = self.repository.get(id).await?;
                Ok::<_, RepositoryError>(document.map(|d| d.views))
            })
            .await?
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    async fn admit(&self, name: &str, policy: &RatePolicy, subject: &str) -> Result<Admission> {
        let admission = self.governor.check(name, policy, subject).await;
        if admission.allowed {
            return Ok(admission);
        }

        let retry_after = admission.retry_after(Utc::now());
        info!(
            policy = name,
            subject,
            retry_after_secs = retry_after.as_secs(),
            "Request rate limited"
        );
        Err(AppError::RateLimited { retry_after })
    }
}
