// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Data models for shared documents

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitizer::SanitizeMode;

/// Category assigned when a submission names none.
pub const DEFAULT_CATEGORY: &str = "general";

/// Hex characters kept from the content hash.
pub const DOCUMENT_ID_LEN: usize = 12;

/// A published, sanitized document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDocument {
    /// Short content-derived identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Sanitized markup
    pub content: String,
    /// Lowercase category slug
    pub category: String,
    /// Optional short description
    pub description: Option<String>,
    /// Listed in the recent feed
    pub is_public: bool,
    /// View counter
    pub views: u64,
    /// Whitespace between tags was collapsed at publish time
    pub compacted: bool,
    /// Mode the content was sanitized with
    pub sanitize_mode: SanitizeMode,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl SharedDocument {
    /// Content kept its handlers and must be served inside a script sandbox.
    pub fn needs_sandbox(&self) -> bool {
        self.sanitize_mode == SanitizeMode::Permissive
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            views: self.views,
            created_at: self.created_at,
        }
    }
}

/// List view of a document, without its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub views: u64,
    pub created_at: DateTime<Utc>,
}

/// Publish request body
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub compact: bool,
}

fn default_public() -> bool {
    true
}

impl Submission {
    /// The submitted category, trimmed and lowercased, or the default.
    pub fn category_or_default(&self) -> String {
        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category.to_lowercase(),
            _ => DEFAULT_CATEGORY.to_string(),
        }
    }

    /// The description with surrounding whitespace removed, if any is left.
    pub fn trimmed_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

/// Derive a document id from its content and creation instant.
///
/// The id is unpredictable without both inputs but not collision-free;
/// the repository refuses duplicates.
pub fn derive_document_id(content: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content.as_bytes());
    hasher.update(
        created_at
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..DOCUMENT_ID_LEN].to_string()
}

/// Whether `id` has the shape of a derived document id.
pub fn is_document_id(id: &str) -> bool {
    id.len() == DOCUMENT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_id_is_deterministic_and_short() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = derive_document_id("<p>hi</p>", at);
        let b = derive_document_id("<p>hi</p>", at);
        assert_eq!(a, b);
        assert_eq!(a.len(), DOCUMENT_ID_LEN);
        assert!(is_document_id(&a));
    }

    #[test]
    fn test_id_depends_on_content_and_instant() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let later = at + chrono::Duration::nanoseconds(1);
        let base = derive_document_id("<p>hi</p>", at);
        assert_ne!(base, derive_document_id("<p>ho</p>", at));
        assert_ne!(base, derive_document_id("<p>hi</p>", later));
    }

    #[test]
    fn test_is_document_id() {
        assert!(is_document_id("0123456789ab"));
        assert!(!is_document_id("0123456789AB"));
        assert!(!is_document_id("0123456789a"));
        assert!(!is_document_id("../etc/passw"));
    }

    #[test]
    fn test_submission_defaults() {
        let submission: Submission =
            serde_json::from_str(r#"{"title": "T", "content": "<p>x</p>"}"#).unwrap();
        assert!(submission.is_public);
        assert!(!submission.compact);
        assert_eq!(submission.category_or_default(), "general");
        assert_eq!(submission.trimmed_description(), None);
    }

    #[test]
    fn test_category_is_normalised() {
        let submission: Submission = serde_json::from_str(
            r#"{"title": "T", "content": "x", "category": "  Landing-Page ", "description": "  "}"#,
        )
        .unwrap();
        assert_eq!(submission.category_or_default(), "landing-page");
        assert_eq!(submission.trimmed_description(), None);
    }
}
