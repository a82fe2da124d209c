// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for verdicts and event store failures.

use crate::validator::Verdict;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Store operation label values.
pub const OP_APPEND: &str = "append";
pub const OP_COUNT: &str = "count";

/// Shield metrics backed by their own registry.
#[derive(Clone)]
pub struct ShieldMetrics {
    registry: Registry,
    verdicts: IntCounterVec,
    store_errors: IntCounterVec,
}

impl ShieldMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let verdicts = IntCounterVec::new(
            Opts::new("spamshield_verdicts_total", "Verdicts by outcome"),
            &["outcome"],
        )?;
        let store_errors = IntCounterVec::new(
            Opts::new("spamshield_store_errors_total", "Event store failures by operation"),
            &["op"],
        )?;

        registry.register(Box::new(verdicts.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(Self {
            registry,
            verdicts,
            store_errors,
        })
    }

    pub fn record_verdict(&self, verdict: &Verdict) {
        let outcome = verdict.reason.map(|r| r.as_str()).unwrap_or("allowed");
        self.verdicts.with_label_values(&[outcome]).inc();
    }

    pub fn record_store_error(&self, op: &str) {
        self.store_errors.with_label_values(&[op]).inc();
    }

    pub fn verdict_count(&self, outcome: &str) -> u64 {
        self.verdicts.with_label_values(&[outcome]).get()
    }

    pub fn store_error_count(&self, op: &str) -> u64 {
        self.store_errors.with_label_values(&[op]).get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
