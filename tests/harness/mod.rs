// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for spam shield attack simulation.
//!
//! This module provides client profiles, request generators, outcome
//! accounting and a store that fails on demand.

pub mod attacks;
pub mod generators;
pub mod metrics;
pub mod stores;
