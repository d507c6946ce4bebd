//! User-agent fingerprinting for the visitor tracker.

use woothee::parser::Parser;
use xxhash_rust::xxh64::xxh64;

use crate::model::visitor::DeviceType;

const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedUserAgent {
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub device_type: DeviceType,
    pub is_bot: bool,
}

pub fn parse_user_agent(ua: &str) -> ParsedUserAgent {
    let Some(result) = Parser::new().parse(ua) else {
        return ParsedUserAgent {
            device_type: device_type_for(ua, ""),
            ..ParsedUserAgent::default()
        };
    };

    ParsedUserAgent {
        browser: known(&result.name),
        browser_version: known(&result.version),
        os: known(&result.os),
        os_version: known(&result.os_version),
        device_type: device_type_for(ua, result.category),
        is_bot: result.category == "crawler",
    }
}

fn known<S: AsRef<str>>(value: S) -> Option<String> {
    let value = value.as_ref();
    (value != UNKNOWN && !value.is_empty()).then(|| value.to_string())
}

/// Tablets are reported by woothee as "pc" or "smartphone", so they are
/// recognised from the raw string first.
fn device_type_for(ua: &str, category: &str) -> DeviceType {
    let lower = ua.to_ascii_lowercase();
    let android_tablet = lower.contains("android") && !lower.contains("mobile");
    if lower.contains("ipad") || lower.contains("tablet") || android_tablet {
        return DeviceType::Tablet;
    }
    match category {
        "smartphone" | "mobilephone" => DeviceType::Mobile,
        _ => DeviceType::Desktop,
    }
}

/// 16-char hex xxHash64 of `input`
pub fn fingerprint(input: &str) -> String {
    format!("{:016x}", xxh64(input.as_bytes(), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
    const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    #[test]
    fn test_desktop_chrome() {
        let parsed = parse_user_agent(CHROME_DESKTOP);
        assert_eq!(parsed.browser.as_deref(), Some("Chrome"));
        assert_eq!(parsed.device_type, DeviceType::Desktop);
        assert!(!parsed.is_bot);
    }

    #[test]
    fn test_crawler_is_flagged() {
        assert!(parse_user_agent(GOOGLEBOT).is_bot);
        assert!(!parse_user_agent(IPHONE).is_bot);
    }

    #[test]
    fn test_iphone_is_mobile() {
        assert_eq!(parse_user_agent(IPHONE).device_type, DeviceType::Mobile);
    }

    #[test]
    fn test_tablets() {
        assert_eq!(parse_user_agent(IPAD).device_type, DeviceType::Tablet);
        assert_eq!(parse_user_agent(ANDROID_TABLET).device_type, DeviceType::Tablet);
    }

    #[test]
    fn test_garbage_defaults_to_desktop() {
        let parsed = parse_user_agent("curl-ish");
        assert_eq!(parsed.device_type, DeviceType::Desktop);
        assert_eq!(parsed.browser, None);
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("1.2.3.4|2026-01-01T00:00:00.000Z");
        assert_eq!(a.len(), 16);
        assert_eq!(a, fingerprint("1.2.3.4|2026-01-01T00:00:00.000Z"));
        assert_ne!(a, fingerprint("1.2.3.4|2026-01-01T00:00:00.001Z"));
    }
}
