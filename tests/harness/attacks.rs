// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Attack simulation patterns for security testing.

use super::generators;
use spamshield::signals::RequestSignals;

/// Client behaviour driving one simulated attack.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated seconds between consecutive requests
    pub seconds_between_requests: i64,
    /// Number of unique IPs to rotate through
    pub unique_ips: usize,
    /// Action posted to
    pub action: &'static str,
    /// User agent sent; `None` means a real browser
    pub user_agent: Option<&'static str>,
    /// Value put in the honeypot field
    pub honeypot: Option<&'static str>,
    /// Whether the page script ran
    pub runs_script: bool,
    /// Whether the probe cookie is returned
    pub keeps_cookies: bool,
    /// Seconds between form render and submit
    pub fill_seconds: i64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 50,
            seconds_between_requests: 1,
            unique_ips: 1,
            action: "user/register",
            user_agent: None,
            honeypot: Some("nobot"),
            runs_script: true,
            keeps_cookies: true,
            fill_seconds: 20,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Command-line HTTP client hammering the registration form.
    pub fn curl_flood() -> Self {
        Self {
            total_requests: 200,
            user_agent: Some("curl/8.0"),
            honeypot: None,
            runs_script: false,
            keeps_cookies: false,
            fill_seconds: 0,
            ..Default::default()
        }
    }

    /// Form filler that writes into every field it finds.
    pub fn honeypot_filler() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            honeypot: Some("https://cheap-pills.example"),
            ..Default::default()
        }
    }

    /// Script that submits as soon as the form loads.
    pub fn speed_submitter() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 50,
            fill_seconds: 0,
            ..Default::default()
        }
    }

    /// Client that never returns cookies, on a non-strict action.
    pub fn cookieless_client() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 50,
            action: "comment/add",
            keeps_cookies: false,
            ..Default::default()
        }
    }

    /// Headless browser passing every check but submitting every second.
    pub fn headless_burst() -> Self {
        Self {
            total_requests: 60,
            seconds_between_requests: 1,
            ..Default::default()
        }
    }

    /// Many real visitors, each submitting once.
    pub fn distributed_humans() -> Self {
        Self {
            total_requests: 100,
            seconds_between_requests: 0,
            unique_ips: 100,
            action: "contact",
            ..Default::default()
        }
    }

    /// Single client spacing submissions past the window.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 20,
            seconds_between_requests: 11,
            ..Default::default()
        }
    }

    /// Build the signals for request `index` sent at `now`.
    pub fn signals_for(&self, index: usize, ip: &str, now: i64) -> RequestSignals {
        let mut signals = generators::browser_signals(ip, self.action, now);
        if let Some(ua) = self.user_agent {
            signals.user_agent = ua.to_string();
        } else {
            let browsers = generators::browser_user_agents();
            signals.user_agent = browsers[index % browsers.len()].to_string();
        }
        signals.honeypot_value = self.honeypot.map(str::to_string);
        signals.ajax_capability_flag = self.runs_script;
        signals.has_probe_cookie = self.keeps_cookies;
        signals.declared_start_time = if self.runs_script {
            Some(now - self.fill_seconds)
        } else {
            None
        };
        signals
    }
}
