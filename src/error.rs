// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the sharegate service.
//!
//! Infrastructure errors (`StoreError`) are recovered inside the cache and
//! the rate governor and never reach a caller. `AppError` is what the
//! publishing and delivery paths surface, and maps onto an HTTP response.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::validator::ValidationError;

/// Backing key-value store failures.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store is disabled")]
    Disabled,

    #[error("Store protocol error: {0}")]
    Protocol(String),
}

/// Durable document store failures.
#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    #[error("Document id already exists: {0}")]
    Duplicate(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

/// Request-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Rate limit exceeded, retry in {}s", retry_after_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Round a retry hint up to whole seconds, never below one.
pub fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SUBMISSION"),
            Self::NotFound(_) | Self::Repository(RepositoryError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            Self::Repository(RepositoryError::Duplicate(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_ID")
            }
            Self::Repository(RepositoryError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "REPOSITORY_UNAVAILABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match &self {
            Self::RateLimited { retry_after } => {
                let secs = retry_after_secs(retry_after);
                (
                    status,
                    [(header::RETRY_AFTER, secs.to_string())],
                    Json(ErrorResponse {
                        error: self.to_string(),
                        code,
                        retry_after_secs: Some(secs),
                    }),
                )
                    .into_response()
            }
            _ => (
                status,
                Json(ErrorResponse {
                    error: self.to_string(),
                    code,
                    retry_after_secs: None,
                }),
            )
                .into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
