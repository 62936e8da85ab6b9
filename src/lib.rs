// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! sharegate
//!
//! This crate accepts untrusted markup documents, makes them safe to
//! re-serve and serves them under load:
//!
//! - Content sanitizer with an allow-list for trusted script origins
//! - Cache-aside layer with per-family TTLs, stale fallback and
//!   single-flight recomputation
//! - Fixed-window rate governor that fails open when its store is down
//! - Publishing pipeline and HTTP surface composing the three

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod keys;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod repository;
pub mod sanitizer;
pub mod store;
pub mod validator;

pub use cache::CacheStore;
pub use config::Config;
pub use error::{AppError, StoreError};
pub use limiter::{Admission, RateGovernor};
pub use pipeline::Publisher;
pub use sanitizer::{sanitize, SanitizeMode};
pub use validator::{SubmissionValidator, ValidationResult};
