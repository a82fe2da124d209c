// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding window rate limiter backed by the event log.
//!
//! Every attempt that reaches the limiter is appended as a `ratelimit`
//! event first, then the client's attempts inside the trailing window are
//! counted. The count includes the attempt just recorded, so a second
//! attempt inside one window is blocked. There is no refill or burst
//! allowance beyond that.

use crate::config::{FailMode, ShieldConfig};
use crate::event::{EventType, NewEvent};
use crate::metrics::{ShieldMetrics, OP_APPEND, OP_COUNT};
use crate::signals::RequestSignals;
use crate::store::EventStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts allowed per client inside one window, including the current one.
const MAX_ATTEMPTS_PER_WINDOW: u64 = 1;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Attempts seen in the window, `None` when the count was unavailable
        attempts: Option<u64>,
    },
    /// Request is rate limited
    Limited {
        /// Attempts seen in the window, `None` when failing closed
        attempts: Option<u64>,
        /// Upper bound on the wait before the window clears
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Rate limiter sharing the validator's event store.
pub struct RateLimiter<S> {
    store: Arc<S>,
    metrics: Option<ShieldMetrics>,
}

impl<S: EventStore> RateLimiter<S> {
    /// Create a new rate limiter over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ShieldMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record this attempt, then decide from the attempts in the window.
    pub async fn check_and_record(
        &self,
        signals: &RequestSignals,
        config: &ShieldConfig,
        now: i64,
    ) -> RateLimitResult {
        let ip = signals.client_id.as_str();

        let attempt = NewEvent {
            time_created: now,
            ip: ip.to_string(),
            user_guid: signals.user_guid,
            event_type: EventType::RateLimit,
            reason: "Action attempt".to_string(),
            details: json!({ "ip": ip, "action": signals.action_name }),
        };

        if let Err(e) = self.store.append(attempt).await {
            warn!(%ip, error = %e, "Failed to record rate limit attempt");
            self.note_store_error(OP_APPEND);
        }

        let cutoff = now.saturating_sub(config.rate_limit_window_seconds);
        match self
            .store
            .count_since(ip, EventType::RateLimit, cutoff)
            .await
        {
            Ok(attempts) if attempts > MAX_ATTEMPTS_PER_WINDOW => {
                debug!(%ip, attempts, "Client rate limit exceeded");
                RateLimitResult::Limited {
                    attempts: Some(attempts),
                    retry_after: config.window_duration(),
                }
            }
            Ok(attempts) => RateLimitResult::Allowed {
                attempts: Some(attempts),
            },
            Err(e) => {
                self.note_store_error(OP_COUNT);
                match config.count_failure_mode {
                    FailMode::Open => {
                        warn!(%ip, error = %e, "Rate limit count failed, failing open");
                        RateLimitResult::Allowed { attempts: None }
                    }
                    FailMode::Closed => {
                        warn!(%ip, error = %e, "Rate limit count failed, failing closed");
                        RateLimitResult::Limited {
                            attempts: None,
                            retry_after: config.window_duration(),
                        }
                    }
                }
            }
        }
    }

    fn note_store_error(&self, op: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_store_error(op);
        }
    }
}
