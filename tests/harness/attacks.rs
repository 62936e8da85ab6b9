// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack simulation patterns for security testing.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of publish requests to send
    pub total_requests: usize,
    /// Number of unique subjects to rotate through
    pub unique_subjects: usize,
    /// Fraction of requests carrying an XSS payload (0.0-1.0)
    pub hostile_ratio: f64,
    /// Whether hostile documents also carry trusted embeds
    pub with_trusted_embeds: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_subjects: 1,
            hostile_ratio: 0.0,
            with_trusted_embeds: false,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single subject flood - one client publishing as fast as it can.
    pub fn single_subject_flood() -> Self {
        Self {
            total_requests: 200,
            unique_subjects: 1,
            ..Default::default()
        }
    }

    /// Distributed flood - many subjects, few requests each.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            unique_subjects: 100,
            ..Default::default()
        }
    }

    /// XSS barrage - every document is hostile, spread thin enough that
    /// the rate limit never interferes.
    pub fn xss_barrage() -> Self {
        Self {
            total_requests: 110,
            unique_subjects: 22,
            hostile_ratio: 1.0,
            with_trusted_embeds: true,
        }
    }

    /// Mixed traffic - some hostile documents, some subjects over limit.
    pub fn mixed_traffic() -> Self {
        Self {
            total_requests: 200,
            unique_subjects: 10,
            hostile_ratio: 0.3,
            with_trusted_embeds: true,
        }
    }

    /// Requests a given subject sends under round-robin rotation.
    pub fn requests_for_subject(&self, subject_index: usize) -> usize {
        let base = self.total_requests / self.unique_subjects;
        let extra = usize::from(subject_index < self.total_requests % self.unique_subjects);
        base + extra
    }

    /// Number of publishes that should get through a per-subject `limit`.
    pub fn expected_published(&self, limit: u32) -> usize {
        (0..self.unique_subjects)
            .map(|s| self.requests_for_subject(s).min(limit as usize))
            .sum()
    }
}

/// Simple deterministic "random" based on index and ratio.
pub fn rand_bool(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_published() {
        let flood = AttackConfig::single_subject_flood();
        assert_eq!(flood.expected_published(10), 10);

        let distributed = AttackConfig::distributed_flood();
        assert_eq!(distributed.requests_for_subject(0), 5);
        assert_eq!(distributed.expected_published(10), 500);

        let uneven = AttackConfig {
            total_requests: 7,
            unique_subjects: 3,
            ..Default::default()
        };
        assert_eq!(uneven.requests_for_subject(0), 3);
        assert_eq!(uneven.requests_for_subject(2), 2);
        assert_eq!(uneven.expected_published(2), 6);
    }
}
