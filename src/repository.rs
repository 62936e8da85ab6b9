// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Durable document storage boundary.
//!
//! Everything the cache holds is derived from this store. Its failures are
//! the only ones the publishing and delivery paths let through.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::document::{DocumentSummary, SharedDocument};
use crate::error::RepositoryError;

/// Durable document store
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persist a new document. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, document: SharedDocument) -> Result<SharedDocument, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<SharedDocument>, RepositoryError>;

    /// Add one view and return the new total.
    async fn increment_views(&self, id: &str) -> Result<u64, RepositoryError>;

    /// Newest public documents first.
    async fn recent_public(&self, limit: usize) -> Result<Vec<DocumentSummary>, RepositoryError>;
}

/// In-process repository
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    documents: RwLock<HashMap<String, SharedDocument>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn insert(&self, document: SharedDocument) -> Result<SharedDocument, RepositoryError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.id) {
            return Err(RepositoryError::Duplicate(document.id));
        }
        documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn get(&self, id: &str) -> Result<Option<SharedDocument>, RepositoryError> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn increment_views(&self, id: &str) -> Result<u64, RepositoryError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        document.views = document.views.saturating_add(1);
        Ok(document.views)
    }

    async fn recent_public(&self, limit: usize) -> Result<Vec<DocumentSummary>, RepositoryError> {
        let documents = self.documents.read().await;
        let mut public: Vec<&SharedDocument> =
            documents.values().filter(|d| d.is_public).collect();
        public.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(public
            .into_iter()
            .take(limit)
            .map(SharedDocument::summary)
            .collect())
    }
}
