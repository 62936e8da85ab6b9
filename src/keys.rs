// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Store key layout.
//!
//! Cache keys are `{family}:{entity_id}[:{variant}...]`, rate limit
//! counters are `ratelimit:{subject}:{window_start_epoch_ms}`.

use std::fmt;

/// Page sizes the recent list is cached under. Family-wide invalidation
/// enumerates exactly these, since the store has no wildcard delete.
pub const LIST_PAGE_SIZES: [usize; 3] = [10, 20, 50];

/// Entity id of the single recent-documents list.
pub const RECENT_ENTITY: &str = "latest";

const STALE_PREFIX: &str = "stale";
const RATE_LIMIT_PREFIX: &str = "ratelimit";

/// Named cache categories, each with its own value type, TTL and
/// invalidation fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    /// A single `SharedDocument`
    Document,
    /// A page of recent public `DocumentSummary` values
    Recent,
    /// Last known view count of a document
    Views,
}

impl CacheFamily {
    pub const ALL: [CacheFamily; 3] = [Self::Document, Self::Recent, Self::Views];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Recent => "recent",
            Self::Views => "views",
        }
    }

    /// Payload format version. Bump when the family's value type changes
    /// shape; older entries then read as misses.
    pub fn format_version(&self) -> u32 {
        match self {
            Self::Document => 2,
            Self::Recent => 1,
            Self::Views => 1,
        }
    }

    /// Closed set of variant parameters entries of this family are stored
    /// under.
    pub fn variants(&self) -> &'static [usize] {
        match self {
            Self::Recent => &LIST_PAGE_SIZES,
            Self::Document | Self::Views => &[],
        }
    }

    /// The single entity id of families that cache one logical object.
    /// Families keyed by document id have no enumerable key set.
    pub fn fixed_entity(&self) -> Option<&'static str> {
        match self {
            Self::Recent => Some(RECENT_ENTITY),
            Self::Document | Self::Views => None,
        }
    }

    /// Families whose entry for the same entity is dropped alongside this one.
    pub fn derived(&self) -> &'static [CacheFamily] {
        match self {
            Self::Document => &[Self::Views],
            Self::Recent | Self::Views => &[],
        }
    }
}

impl fmt::Display for CacheFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully qualified cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    family: CacheFamily,
    entity_id: String,
    variants: Vec<String>,
}

impl CacheKey {
    pub fn new(family: CacheFamily, entity_id: impl Into<String>) -> Self {
        Self {
            family,
            entity_id: entity_id.into(),
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl ToString) -> Self {
        self.variants.push(variant.to_string());
        self
    }

    pub fn document(id: &str) -> Self {
        Self::new(CacheFamily::Document, id)
    }

    pub fn views(id: &str) -> Self {
        Self::new(CacheFamily::Views, id)
    }

    pub fn recent(page_size: usize) -> Self {
        Self::new(CacheFamily::Recent, RECENT_ENTITY).with_variant(page_size)
    }

    pub fn family(&self) -> CacheFamily {
        self.family
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Key of the last-known-good copy kept for recomputation failures.
    pub fn stale(&self) -> String {
        format!("{}:{}", STALE_PREFIX, self)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.entity_id)?;
        for variant in &self.variants {
            write!(f, ":{}", variant)?;
        }
        Ok(())
    }
}

/// Counter key for one subject in one fixed window.
pub fn rate_limit_key(subject: &str, window_start_ms: i64) -> String {
    format!("{}:{}:{}", RATE_LIMIT_PREFIX, subject, window_start_ms)
}

/// Map a requested list size onto the cached set: the smallest page size
/// that covers the request, capped at the largest.
pub fn normalize_page_size(requested: usize) -> usize {
    LIST_PAGE_SIZES
        .iter()
        .copied()
        .find(|&size| size >= requested)
        .unwrap_or(LIST_PAGE_SIZES[LIST_PAGE_SIZES.len() - 1])
}
