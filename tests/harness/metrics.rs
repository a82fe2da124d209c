// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-layer tallies for attack simulations.

use spamshield::event::EventType;
use spamshield::validator::Verdict;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where a simulated request ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    Blocked(EventType),
}

impl From<&Verdict> for Outcome {
    fn from(verdict: &Verdict) -> Self {
        match verdict.reason {
            Some(reason) if !verdict.allowed => Self::Blocked(reason),
            _ => Self::Allowed,
        }
    }
}

/// Tallies verdicts while an attack profile runs.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    allowed: usize,
    blocked_by: HashMap<EventType, usize>,
    clients: HashSet<String>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        match outcome {
            Outcome::Allowed => self.allowed += 1,
            Outcome::Blocked(layer) => *self.blocked_by.entry(layer).or_default() += 1,
        }
        self.clients.insert(ip.to_string());
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Allowed => self.allowed,
            Outcome::Blocked(layer) => self.blocked_by.get(&layer).copied().unwrap_or_default(),
        }
    }

    fn blocked(&self) -> usize {
        self.blocked_by.values().sum()
    }

    /// Layer that stopped the most requests.
    pub fn dominant_layer(&self) -> Option<EventType> {
        self.blocked_by
            .iter()
            .max_by_key(|(_, n)| **n)
            .map(|(layer, _)| *layer)
    }

    pub fn report(&self) -> MetricsReport {
        let layer = |t| self.count(Outcome::Blocked(t));
        MetricsReport {
            total_requests: self.allowed + self.blocked(),
            allowed: self.allowed,
            honeypot: layer(EventType::Honeypot),
            noajax: layer(EventType::NoAjax),
            timing: layer(EventType::Timing),
            cookie: layer(EventType::Cookie),
            ua: layer(EventType::Ua),
            rate_limited: layer(EventType::RateLimit),
            unique_ips: self.clients.len(),
            dominant_layer: self.dominant_layer(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub honeypot: usize,
    pub noajax: usize,
    pub timing: usize,
    pub cookie: usize,
    pub ua: usize,
    pub rate_limited: usize,
    pub unique_ips: usize,
    pub dominant_layer: Option<EventType>,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} requests from {} clients, {} allowed",
            self.total_requests, self.unique_ips, self.allowed
        )?;
        let rows = [
            ("honeypot", self.honeypot),
            ("noajax", self.noajax),
            ("timing", self.timing),
            ("cookie", self.cookie),
            ("ua", self.ua),
            ("ratelimit", self.rate_limited),
        ];
        for (name, n) in rows.iter().filter(|(_, n)| *n > 0) {
            writeln!(f, "  {name:<10} {n}")?;
        }
        match self.dominant_layer {
            Some(layer) => write!(f, "  mostly stopped by {layer}"),
            None => write!(f, "  nothing blocked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tallies_by_layer() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        for _ in 0..4 {
            metrics.record(Outcome::Blocked(EventType::RateLimit), "10.0.0.1");
        }
        metrics.record(Outcome::Blocked(EventType::Ua), "10.0.0.2");

        let report = metrics.report();
        assert_eq!(report.total_requests, 6);
        assert_eq!(report.rate_limited, 4);
        assert_eq!(report.unique_ips, 2);
        assert_eq!(report.dominant_layer, Some(EventType::RateLimit));
    }

    #[test]
    fn test_outcome_from_verdict() {
        assert_eq!(Outcome::from(&Verdict::allow()), Outcome::Allowed);
        assert_eq!(
            Outcome::from(&Verdict::block(EventType::Ua)),
            Outcome::Blocked(EventType::Ua)
        );
    }
}
