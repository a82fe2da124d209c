// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Detection and attempt events recorded in the append-only log.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Monotonic event identifier assigned by the store.
pub type EventId = u64;

/// Kind of event. Every blocking reason code is also an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Honeypot,
    NoAjax,
    Timing,
    Cookie,
    Ua,
    RateLimit,
}

impl EventType {
    /// Wire name used in the log and in reason codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Honeypot => "honeypot",
            Self::NoAjax => "noajax",
            Self::Timing => "timing",
            Self::Cookie => "cookie",
            Self::Ua => "ua",
            Self::RateLimit => "ratelimit",
        }
    }

    /// Message key the caller renders when a request is blocked for this reason.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Honeypot => "spamshield:blocked:honeypot",
            Self::NoAjax => "spamshield:blocked:noajax",
            Self::Timing => "spamshield:blocked:timing",
            Self::Cookie => "spamshield:blocked:nocookie",
            Self::Ua => "spamshield:blocked:ua",
            Self::RateLimit => "spamshield:blocked:ratelimit",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Unix seconds
    pub time_created: i64,
    pub ip: String,
    pub user_guid: Option<u64>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub reason: String,
    /// Opaque structured context (serialized map)
    pub details: Value,
}

/// A stored event. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub time_created: i64,
    pub ip: String,
    pub user_guid: Option<u64>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub reason: String,
    pub details: Value,
}

impl Event {
    pub fn from_new(id: EventId, new: NewEvent) -> Self {
        Self {
            id,
            time_created: new.time_created,
            ip: new.ip,
            user_guid: new.user_guid,
            event_type: new.event_type,
            reason: new.reason,
            details: new.details,
        }
    }
}
