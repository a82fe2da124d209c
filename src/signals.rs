// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Signal extraction.
//!
//! Turns the raw inputs handed over by the request layer into the
//! normalized [`RequestSignals`] the validator works on. Extraction is pure
//! and never fails; absent inputs map to their documented defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Hidden honeypot form field.
pub const HONEYPOT_FIELD: &str = "_psh";
/// Value a real browser leaves in the honeypot field.
pub const HONEYPOT_SENTINEL: &str = "nobot";
/// Client-reported form start time (unix seconds).
pub const START_TIME_FIELD: &str = "_pst";
/// Flag set by the page script when it ran.
pub const AJAX_FLAG_FIELD: &str = "ps_ajax";
/// Probe cookie name.
pub const PROBE_COOKIE: &str = "ps_probe";

/// Authentication tier of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthTier {
    #[default]
    Guest,
    User,
    Admin,
}

impl FromStr for AuthTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown auth tier: {other}")),
        }
    }
}

/// Result of the external authentication lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub tier: AuthTier,
    #[serde(default)]
    pub user_guid: Option<u64>,
}

impl AuthState {
    pub fn guest() -> Self {
        Self::default()
    }
}

/// Raw inputs as received from the request layer.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    /// Action being invoked, e.g. `user/register`
    pub action: String,
    /// Parsed client network address
    pub remote_addr: String,
    /// `User-Agent` header value
    pub user_agent: Option<String>,
    /// `X-Requested-With` header value
    pub requested_with: Option<String>,
    /// `Cookie` header value
    pub cookie_header: Option<String>,
    /// Submitted form fields
    pub form: HashMap<String, String>,
}

impl RawRequest {
    /// Decode an `application/x-www-form-urlencoded` body into form fields.
    /// Later duplicates win.
    pub fn parse_form(body: &[u8]) -> HashMap<String, String> {
        url::form_urlencoded::parse(body).into_owned().collect()
    }
}

/// Normalized per-request signals. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignals {
    pub client_id: String,
    pub user_agent: String,
    pub action_name: String,
    pub auth_tier: AuthTier,
    pub user_guid: Option<u64>,
    /// `None` when the honeypot field was not rendered
    pub honeypot_value: Option<String>,
    pub ajax_capability_flag: bool,
    pub declared_start_time: Option<i64>,
    pub has_probe_cookie: bool,
    /// Shapes the response only, never the verdict
    pub is_ajax_transport: bool,
}

/// Derive request signals from raw inputs and the auth lookup.
pub fn extract(raw: &RawRequest, auth: &AuthState) -> RequestSignals {
    let probe = cookie_value(raw.cookie_header.as_deref(), PROBE_COOKIE);

    RequestSignals {
        client_id: raw.remote_addr.trim().to_string(),
        user_agent: raw.user_agent.clone().unwrap_or_default(),
        action_name: raw.action.trim_matches('/').to_string(),
        auth_tier: auth.tier,
        user_guid: auth.user_guid,
        honeypot_value: raw.form.get(HONEYPOT_FIELD).cloned(),
        ajax_capability_flag: is_truthy(raw.form.get(AJAX_FLAG_FIELD).map(String::as_str)),
        declared_start_time: raw
            .form
            .get(START_TIME_FIELD)
            .and_then(|v| parse_leading_int(v)),
        has_probe_cookie: is_truthy(probe),
        is_ajax_transport: raw
            .requested_with
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("xmlhttprequest")),
    }
}

/// Present, non-empty and not `"0"`.
pub fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "0")
}

/// Look up a cookie by name in a `Cookie` header.
pub fn cookie_value<'a>(header: Option<&'a str>, name: &str) -> Option<&'a str> {
    header?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim())
}

/// Parse an optionally signed integer from the leading digits of `value`.
/// Returns `None` when no digits lead the value.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
