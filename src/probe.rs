// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Probe marker verification and issuance.
//!
//! A browser that loaded a page before submitting carries the probe cookie
//! back. The request layer issues the cookie once per client; the verifier
//! only reports whether it came back.

use crate::config::SameSite;
use crate::signals::{RequestSignals, PROBE_COOKIE};

/// Capability check for cookie support plus a prior page load.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeVerifier;

impl ProbeVerifier {
    pub fn new() -> Self {
        Self
    }

    pub fn has_valid_probe(&self, signals: &RequestSignals) -> bool {
        signals.has_probe_cookie
    }
}

/// Build the `Set-Cookie` value for the probe marker.
pub fn probe_cookie_header(same_site: SameSite, secure: bool) -> String {
    let mut parts = vec![
        format!("{PROBE_COOKIE}=1"),
        "Path=/".to_string(),
        format!("SameSite={same_site}"),
    ];
    if secure {
        parts.push("Secure".to_string());
    }
    parts.push("HttpOnly".to_string());
    parts.join("; ")
}

/// The probe cookie to set, or `None` if the client already carries it.
pub fn probe_cookie_to_issue(
    already_present: bool,
    same_site: SameSite,
    secure: bool,
) -> Option<String> {
    (!already_present).then(|| probe_cookie_header(same_site, secure))
}

/// Whether the request reached us over TLS.
pub fn is_secure_transport(forwarded_proto: Option<&str>, port: Option<u16>) -> bool {
    let https = forwarded_proto.is_some_and(|p| {
        let p = p.trim();
        p.eq_ignore_ascii_case("https") || p.eq_ignore_ascii_case("on")
    });
    https || port == Some(443)
}
