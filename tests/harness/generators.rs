// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use spamshield::signals::{AuthTier, RequestSignals, HONEYPOT_SENTINEL};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// User agents sent by ordinary browsers.
pub fn browser_user_agents() -> Vec<&'static str> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
    ]
}

/// User agents sent by scripts, crawlers and HTTP libraries.
pub fn automation_user_agents() -> Vec<&'static str> {
    vec![
        "curl/8.0",
        "CURL/7.88.1",
        "python-requests/2.31.0",
        "Python-urllib/3.11",
        "Wget/1.21.4",
        "libwww-perl/6.72",
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
        "Baiduspider+(+http://www.baidu.com/search/spider.htm)",
        "",
        "   ",
    ]
}

/// Signals of a guest browser that did everything right.
pub fn browser_signals(ip: &str, action: &str, now: i64) -> RequestSignals {
    RequestSignals {
        client_id: ip.to_string(),
        user_agent: browser_user_agents()[0].to_string(),
        action_name: action.to_string(),
        auth_tier: AuthTier::Guest,
        user_guid: None,
        honeypot_value: Some(HONEYPOT_SENTINEL.to_string()),
        ajax_capability_flag: true,
        declared_start_time: Some(now - 20),
        has_probe_cookie: true,
        is_ajax_transport: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_browser_signals_start_before_now() {
        let signals = browser_signals("10.0.0.1", "contact", 1000);
        assert_eq!(signals.declared_start_time, Some(980));
    }
}
