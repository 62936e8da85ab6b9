// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission validator.
//!
//! Implements ingress-level validation for publish requests:
//! - Title and content presence
//! - Length limits on title, description and content
//! - Category slug format
//! - Content that sanitizes down to nothing

use crate::config::ValidationConfig;
use crate::document::Submission;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

const MAX_CATEGORY_CHARS: usize = 32;

static CATEGORY_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid category pattern"));

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} is too long: {actual} exceeds the limit of {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Invalid category {0:?}: expected a lowercase slug")]
    InvalidCategory(String),

    #[error("Content is empty after sanitization")]
    EmptyAfterSanitize,
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid,
    /// Submission is invalid
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(e) => Err(e),
        }
    }
}

/// Publish request validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the title.
    pub fn validate_title(&self, title: &str) -> ValidationResult {
        let title = title.trim();
        if title.is_empty() {
            debug!("Missing title");
            return ValidationResult::Invalid(ValidationError::MissingField("title"));
        }

        let chars = title.chars().count();
        if chars > self.config.max_title_chars {
            debug!(chars, max = self.config.max_title_chars, "Title too long");
            return ValidationResult::Invalid(ValidationError::TooLong {
                field: "title",
                max: self.config.max_title_chars,
                actual: chars,
            });
        }

        ValidationResult::Valid
    }

    /// Validate the raw content before sanitization.
    pub fn validate_content(&self, content: &str) -> ValidationResult {
        if content.trim().is_empty() {
            debug!("Missing content");
            return ValidationResult::Invalid(ValidationError::MissingField("content"));
        }

        if content.len() > self.config.max_content_bytes {
            debug!(bytes = content.len(), max = self.config.max_content_bytes, "Content too large");
            return ValidationResult::Invalid(ValidationError::TooLong {
                field: "content",
                max: self.config.max_content_bytes,
                actual: content.len(),
            });
        }

        ValidationResult::Valid
    }

    /// Validate an optional description.
    pub fn validate_description(&self, description: Option<&str>) -> ValidationResult {
        let chars = description.map_or(0, |d| d.trim().chars().count());
        if chars > self.config.max_description_chars {
            debug!(chars, max = self.config.max_description_chars, "Description too long");
            return ValidationResult::Invalid(ValidationError::TooLong {
                field: "description",
                max: self.config.max_description_chars,
                actual: chars,
            });
        }
        ValidationResult::Valid
    }

    /// Validate a normalised category.
    pub fn validate_category(&self, category: &str) -> ValidationResult {
        if category.len() > MAX_CATEGORY_CHARS || !CATEGORY_SLUG.is_match(category) {
            debug!(category = %category, "Invalid category");
            return ValidationResult::Invalid(ValidationError::InvalidCategory(
                category.to_string(),
            ));
        }
        ValidationResult::Valid
    }

    /// Validate what is left once the sanitizer has run.
    pub fn validate_sanitized(&self, sanitized: &str) -> ValidationResult {
        if sanitized.trim().is_empty() {
            debug!("Content sanitized to nothing");
            return ValidationResult::Invalid(ValidationError::EmptyAfterSanitize);
        }
        ValidationResult::Valid
    }

    /// Validate a complete submission.
    pub fn validate(&self, submission: &Submission) -> ValidationResult {
        let checks = [
            self.validate_title(&submission.title),
            self.validate_content(&submission.content),
            self.validate_description(submission.description.as_deref()),
            self.validate_category(&submission.category_or_default()),
        ];

        checks
            .into_iter()
            .find(|result| !result.is_valid())
            .unwrap_or(ValidationResult::Valid)
    }
}
