// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Spam Shield
//!
//! This crate decides whether a form submission or other action request
//! should be allowed, using layered bot checks:
//!
//! - Honeypot field
//! - Ajax capability flag (strict actions)
//! - Submit timing (strict actions)
//! - Probe cookie
//! - User-agent filtering
//! - Per-client sliding window rate limiting
//!
//! Every block and every rate limited attempt is written to an append-only
//! event log.

pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod probe;
pub mod signals;
pub mod store;
pub mod validator;

pub use config::{Config, SettingsSource, ShieldConfig};
pub use event::{Event, EventType};
pub use limiter::{RateLimitResult, RateLimiter};
pub use signals::{extract, AuthState, AuthTier, RawRequest, RequestSignals};
pub use store::{EventLog, EventStore, JsonlEventStore, MemoryEventStore};
pub use validator::{ShieldValidator, Verdict};
