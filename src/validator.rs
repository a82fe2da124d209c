// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission validator.
//!
//! Runs the checks in a fixed order and stops at the first one that fails:
//! 1. Global gate (disabled, authenticated caller, allow-listed action)
//! 2. Honeypot field
//! 3. Ajax capability flag (strict actions, guests)
//! 4. Submit timing (strict actions, guests)
//! 5. Probe cookie (guests)
//! 6. User-agent
//! 7. Rate limit
//!
//! A failing check records exactly one event before the verdict is
//! returned. Storage failures are logged and never change the outcome of
//! checks 2 to 6.

use crate::config::ShieldConfig;
use crate::event::{EventType, NewEvent};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::{ShieldMetrics, OP_APPEND};
use crate::probe::ProbeVerifier;
use crate::signals::{AuthTier, RequestSignals, HONEYPOT_SENTINEL};
use crate::store::EventStore;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Actions that are never validated.
pub const ALLOWED_ACTIONS: &[&str] = &["user/login", "admin/login", "logout"];

/// Actions that get the ajax and timing checks for guests.
pub const STRICT_ACTIONS: &[&str] = &["user/register", "user/resetpassword", "contact"];

/// Case-insensitive user-agent substrings that identify non-browser clients.
pub const SUSPICIOUS_UA_TOKENS: &[&str] = &["curl", "python", "wget", "libwww", "bot", "spider"];

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
        }
    }

    pub fn block(reason: EventType) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            message: Some(reason.message_key()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// A failed check, ready to be logged.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub event_type: EventType,
    pub reason: &'static str,
    pub details: Value,
}

/// Whether the caller skips every check.
pub fn bypasses_checks(config: &ShieldConfig, signals: &RequestSignals) -> bool {
    !config.enabled
        || signals.auth_tier != AuthTier::Guest
        || ALLOWED_ACTIONS.contains(&signals.action_name.as_str())
}

/// Whether the ajax and timing checks apply.
pub fn requires_strict(signals: &RequestSignals) -> bool {
    signals.auth_tier == AuthTier::Guest && STRICT_ACTIONS.contains(&signals.action_name.as_str())
}

/// Blank, `"0"`, or carrying a known automation token.
pub fn is_suspicious_user_agent(user_agent: &str) -> bool {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() || trimmed == "0" {
        return true;
    }
    let ua = user_agent.to_ascii_lowercase();
    SUSPICIOUS_UA_TOKENS.iter().any(|token| ua.contains(token))
}

/// Run checks 2 to 6 and return the first failure.
pub fn first_failing_check(
    config: &ShieldConfig,
    signals: &RequestSignals,
    probe: &ProbeVerifier,
    now: i64,
) -> Option<Block> {
    let ip = signals.client_id.as_str();
    let action = signals.action_name.as_str();
    let strict = requires_strict(signals);

    if let Some(value) = &signals.honeypot_value {
        if value != HONEYPOT_SENTINEL {
            return Some(Block {
                event_type: EventType::Honeypot,
                reason: "Honeypot field filled",
                details: json!({ "ip": ip, "action": action }),
            });
        }
    }

    if strict && signals.auth_tier != AuthTier::Admin && !signals.ajax_capability_flag {
        return Some(Block {
            event_type: EventType::NoAjax,
            reason: "Missing ps_ajax flag",
            details: json!({ "ip": ip, "action": action }),
        });
    }

    if strict && signals.auth_tier != AuthTier::Admin {
        // Missing or non-positive start times are not judged.
        if let Some(start) = signals.declared_start_time.filter(|s| *s > 0) {
            let delta = now.saturating_sub(start);
            if delta < config.min_submit_seconds {
                return Some(Block {
                    event_type: EventType::Timing,
                    reason: "Submitted too fast",
                    details: json!({ "ip": ip, "action": action, "delta": delta }),
                });
            }
        }
    }

    if signals.auth_tier == AuthTier::Guest && !probe.has_valid_probe(signals) {
        return Some(Block {
            event_type: EventType::Cookie,
            reason: "Missing ps_probe cookie",
            details: json!({ "ip": ip, "action": action }),
        });
    }

    if is_suspicious_user_agent(&signals.user_agent) {
        return Some(Block {
            event_type: EventType::Ua,
            reason: "Suspicious UA",
            details: json!({ "ip": ip, "ua": signals.user_agent, "action": action }),
        });
    }

    None
}

/// Spam shield validator.
pub struct ShieldValidator<S> {
    store: Arc<S>,
    limiter: RateLimiter<S>,
    probe: ProbeVerifier,
    metrics: Option<ShieldMetrics>,
}

impl<S: EventStore> ShieldValidator<S> {
    /// Create a new validator logging to the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            limiter: RateLimiter::new(store.clone()),
            store,
            probe: ProbeVerifier::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ShieldMetrics) -> Self {
        self.limiter = RateLimiter::new(self.store.clone()).with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Evaluate one request against a settings snapshot.
    pub async fn evaluate(
        &self,
        config: &ShieldConfig,
        signals: &RequestSignals,
        now: i64,
    ) -> Verdict {
        let verdict = self.decide(config, signals, now).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_verdict(&verdict);
        }
        verdict
    }

    async fn decide(&self, config: &ShieldConfig, signals: &RequestSignals, now: i64) -> Verdict {
        if bypasses_checks(config, signals) {
            debug!(action = %signals.action_name, tier = ?signals.auth_tier, "Checks bypassed");
            return Verdict::allow();
        }

        if let Some(block) = first_failing_check(config, signals, &self.probe, now) {
            info!(
                ip = %signals.client_id,
                action = %signals.action_name,
                reason = %block.event_type,
                "Submission blocked"
            );
            let event_type = block.event_type;
            self.record(signals, block, now).await;
            return Verdict::block(event_type);
        }

        match self.limiter.check_and_record(signals, config, now).await {
            RateLimitResult::Allowed { .. } => {
                debug!(ip = %signals.client_id, action = %signals.action_name, "Submission allowed");
                Verdict::allow()
            }
            RateLimitResult::Limited { attempts, .. } => {
                info!(
                    ip = %signals.client_id,
                    action = %signals.action_name,
                    attempts = ?attempts,
                    reason = %EventType::RateLimit,
                    "Submission blocked"
                );
                Verdict::block(EventType::RateLimit)
            }
        }
    }

    /// Append the block event; failures are reported and swallowed.
    async fn record(&self, signals: &RequestSignals, block: Block, now: i64) {
        let event = NewEvent {
            time_created: now,
            ip: signals.client_id.clone(),
            user_guid: signals.user_guid,
            event_type: block.event_type,
            reason: block.reason.to_string(),
            details: block.details,
        };

        if let Err(e) = self.store.append(event).await {
            warn!(ip = %signals.client_id, error = %e, "Failed to record block event");
            if let Some(metrics) = &self.metrics {
                metrics.record_store_error(OP_APPEND);
            }
        }
    }
}
