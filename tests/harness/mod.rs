// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for sharegate attack simulation.
//!
//! This module provides utilities for simulating publish floods and XSS
//! payloads against the publishing pipeline to validate security controls.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;
pub mod store;
