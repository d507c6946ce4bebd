//! Aggregation of visitor records into the admin analytics report.
//!
//! The repository only selects records inside the requested window; every
//! breakdown below is computed here so the same code serves MongoDB and the
//! in-memory stores used by tests.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use url::Url;

use crate::model::visitor::{Visitor, UNKNOWN_LOCATION};
use crate::util::time::{parse_iso, to_iso};

pub const DEFAULT_PERIOD: &str = "30d";
const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl DateRange {
    /// Explicit `start`/`end` bounds win over `period`. A missing end means
    /// "now"; a date-only end covers that whole day. Unrecognised presets
    /// fall back to the 30 day window.
    pub fn resolve(
        period: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        if start.is_some() || end.is_some() {
            let start_at = match start {
                Some(raw) => parse_iso(raw).ok_or_else(|| format!("Invalid startDate: {}", raw))?,
                None => now - Duration::days(30),
            };
            let end_at = match end {
                Some(raw) => {
                    let at = parse_iso(raw).ok_or_else(|| format!("Invalid endDate: {}", raw))?;
                    if raw.len() == 10 { at + Duration::days(1) - Duration::milliseconds(1) } else { at }
                }
                None => now,
            };
            if start_at > end_at {
                return Err("startDate must not be after endDate".to_string());
            }
            return Ok(DateRange { start: start_at, end: end_at, label: "custom".to_string() });
        }

        let (label, span) = match period.map(str::trim).unwrap_or(DEFAULT_PERIOD) {
            "24h" => ("24h", Duration::hours(24)),
            "7d" => ("7d", Duration::days(7)),
            "90d" => ("90d", Duration::days(90)),
            _ => (DEFAULT_PERIOD, Duration::days(30)),
        };
        Ok(DateRange { start: now - span, end: now, label: label.to_string() })
    }

    pub fn start_iso(&self) -> String {
        to_iso(self.start)
    }

    pub fn end_iso(&self) -> String {
        to_iso(self.end)
    }

    pub fn contains(&self, created_at: &str) -> bool {
        parse_iso(created_at).is_some_and(|at| at >= self.start && at <= self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_visitors: u64,
    pub unique_visitors: u64,
    pub total_page_views: u64,
    pub returning_visitors: u64,
    pub new_visitors: u64,
    /// Percentage of records with a captured email
    pub conversion_rate: f64,
    pub avg_page_views: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageViews {
    pub page: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: String,
    pub visitors: u64,
    pub page_views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocialCounts {
    pub facebook: u64,
    pub twitter: u64,
    pub linkedin: u64,
    pub instagram: u64,
    pub github: u64,
    pub google: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficSource {
    Direct,
    Search,
    Social,
    Referral,
    Email,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficSources {
    pub direct: u64,
    pub search: u64,
    pub social: u64,
    pub referral: u64,
    pub email: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodInfo {
    pub start: String,
    pub end: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: Overview,
    pub device_types: Vec<NamedCount>,
    pub browsers: Vec<NamedCount>,
    pub operating_systems: Vec<NamedCount>,
    pub countries: Vec<NamedCount>,
    pub social_accounts: SocialCounts,
    pub daily_trend: Vec<DailyPoint>,
    pub top_pages: Vec<PageViews>,
    pub email_domains: Vec<DomainCount>,
    pub connection_types: Vec<NamedCount>,
    pub screen_resolutions: Vec<NamedCount>,
    pub traffic_sources: TrafficSources,
    pub period: PeriodInfo,
}

pub fn build_report(visitors: &[Visitor], range: &DateRange) -> AnalyticsReport {
    let total = visitors.len() as u64;
    let unique = visitors.iter().map(|v| v.ip_address.as_str()).collect::<HashSet<_>>().len() as u64;
    let page_views: u64 = visitors.iter().map(|v| u64::from(v.page_views)).sum();
    let returning = visitors.iter().filter(|v| v.is_returning).count() as u64;
    let with_email = visitors.iter().filter(|v| v.email.is_some()).count() as u64;

    let overview = Overview {
        total_visitors: total,
        unique_visitors: unique,
        total_page_views: page_views,
        returning_visitors: returning,
        new_visitors: total - returning,
        conversion_rate: round2(percent(with_email, total)),
        avg_page_views: if total == 0 { 0.0 } else { round2(page_views as f64 / total as f64) },
    };

    let mut social = SocialCounts::default();
    let mut sources = TrafficSources::default();
    for visitor in visitors {
        for (network, present) in visitor.social_accounts.presence() {
            if !present {
                continue;
            }
            match network {
                "facebook" => social.facebook += 1,
                "twitter" => social.twitter += 1,
                "linkedin" => social.linkedin += 1,
                "instagram" => social.instagram += 1,
                "github" => social.github += 1,
                _ => social.google += 1,
            }
        }
        match classify_referrer(visitor.referrer.as_deref()) {
            TrafficSource::Direct => sources.direct += 1,
            TrafficSource::Search => sources.search += 1,
            TrafficSource::Social => sources.social += 1,
            TrafficSource::Referral => sources.referral += 1,
            TrafficSource::Email => sources.email += 1,
        }
    }

    AnalyticsReport {
        overview,
        device_types: ranked(visitors.iter().map(|v| v.device_type.as_str().to_string()), None),
        browsers: ranked(visitors.iter().map(|v| or_unknown(&v.browser)), Some(TOP_N)),
        operating_systems: ranked(visitors.iter().map(|v| or_unknown(&v.os)), Some(TOP_N)),
        countries: ranked(visitors.iter().map(|v| v.country.clone()), Some(TOP_N)),
        social_accounts: social,
        daily_trend: daily_trend(visitors),
        top_pages: top_pages(visitors),
        email_domains: ranked(visitors.iter().filter_map(Visitor::email_domain), Some(TOP_N))
            .into_iter()
            .map(|NamedCount { name, count }| DomainCount { domain: name, count })
            .collect(),
        connection_types: ranked(visitors.iter().filter_map(|v| v.connection_type.clone()), None),
        screen_resolutions: ranked(visitors.iter().filter_map(|v| v.screen_resolution.clone()), Some(TOP_N)),
        traffic_sources: sources,
        period: PeriodInfo {
            start: range.start_iso(),
            end: range.end_iso(),
            label: range.label.clone(),
        },
    }
}

/// Bucket a referrer URL. Webmail hosts and `utm_medium=email` count as
/// email before the search/social host lists are consulted. A referrer that
/// is not a URL with a host is a plain referral.
pub fn classify_referrer(referrer: Option<&str>) -> TrafficSource {
    let Some(referrer) = referrer.map(str::trim).filter(|r| !r.is_empty()) else {
        return TrafficSource::Direct;
    };
    let Ok(url) = Url::parse(referrer) else {
        return TrafficSource::Referral;
    };
    let Some(host) = url.host_str() else {
        return TrafficSource::Referral;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);

    let email_campaign = url
        .query_pairs()
        .any(|(key, value)| key == "utm_medium" && value.eq_ignore_ascii_case("email"));
    if email_campaign
        || host.starts_with("mail.")
        || host.contains(".mail.")
        || ["outlook.live.com", "outlook.office.com", "webmail."].iter().any(|h| host.contains(h))
    {
        return TrafficSource::Email;
    }

    const SEARCH: &[&str] = &["google.", "bing.com", "duckduckgo.com", "yahoo.", "baidu.com", "yandex.", "ecosia.org"];
    const SOCIAL: &[&str] = &[
        "facebook.com", "fb.com", "instagram.com", "linkedin.com", "lnkd.in", "twitter.com", "t.co",
        "x.com", "youtube.com", "pinterest.", "reddit.com", "tiktok.com",
    ];

    let matches = |list: &[&str]| {
        list.iter().any(|needle| {
            if needle.ends_with('.') {
                host.starts_with(needle) || host.contains(&format!(".{}", needle))
            } else {
                host == *needle || host.ends_with(&format!(".{}", needle))
            }
        })
    };

    if matches(SEARCH) {
        TrafficSource::Search
    } else if matches(SOCIAL) {
        TrafficSource::Social
    } else {
        TrafficSource::Referral
    }
}

fn or_unknown(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
}

/// Count occurrences, most frequent first (ties by name), optionally truncated.
fn ranked<I: Iterator<Item = String>>(values: I, limit: Option<usize>) -> Vec<NamedCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut out: Vec<NamedCount> = counts.into_iter().map(|(name, count)| NamedCount { name, count }).collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out
}

fn daily_trend(visitors: &[Visitor]) -> Vec<DailyPoint> {
    let mut days: HashMap<String, (u64, u64)> = HashMap::new();
    for visitor in visitors {
        let Some(day) = visitor.created_at.get(..10) else { continue };
        let entry = days.entry(day.to_string()).or_default();
        entry.0 += 1;
        entry.1 += u64::from(visitor.page_views);
    }
    let mut out: Vec<DailyPoint> = days
        .into_iter()
        .map(|(date, (visitors, page_views))| DailyPoint { date, visitors, page_views })
        .collect();
    out.sort_by(|a, b| a.date.cmp(&b.date));
    out
}

fn top_pages(visitors: &[Visitor]) -> Vec<PageViews> {
    let mut pages: HashMap<&str, u64> = HashMap::new();
    for visitor in visitors {
        if let Some(page) = visitor.current_page.as_deref() {
            *pages.entry(page).or_default() += u64::from(visitor.page_views);
        }
    }
    let mut out: Vec<PageViews> = pages
        .into_iter()
        .map(|(page, views)| PageViews { page: page.to_string(), views })
        .collect();
    out.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.page.cmp(&b.page)));
    out.truncate(TOP_N);
    out
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { part as f64 * 100.0 / total as f64 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn visitor(ip: &str, created_at: &str, views: u32) -> Visitor {
        let mut v = Visitor::new(ip.to_string(), created_at);
        v.page_views = views;
        v
    }

    #[test]
    fn test_resolve_presets_and_default() {
        let range = DateRange::resolve(Some("7d"), None, None, now()).unwrap();
        assert_eq!(range.label, "7d");
        assert_eq!(range.end - range.start, Duration::days(7));

        let range = DateRange::resolve(None, None, None, now()).unwrap();
        assert_eq!(range.label, "30d");

        let range = DateRange::resolve(Some("forever"), None, None, now()).unwrap();
        assert_eq!(range.label, "30d");
    }

    #[test]
    fn test_resolve_explicit_bounds_cover_whole_end_day() {
        let range = DateRange::resolve(Some("24h"), Some("2026-03-01"), Some("2026-03-02"), now()).unwrap();
        assert_eq!(range.label, "custom");
        assert_eq!(range.start_iso(), "2026-03-01T00:00:00.000Z");
        assert_eq!(range.end_iso(), "2026-03-02T23:59:59.999Z");
        assert!(range.contains("2026-03-02T18:00:00.000Z"));
        assert!(!range.contains("2026-03-03T00:00:00.000Z"));
    }

    #[test]
    fn test_resolve_rejects_bad_bounds() {
        assert!(DateRange::resolve(None, Some("soon"), None, now()).is_err());
        assert!(DateRange::resolve(None, Some("2026-03-05"), Some("2026-03-01"), now()).is_err());
    }

    #[test]
    fn test_overview_counts() {
        let mut a = visitor("1.1.1.1", "2026-03-09T10:00:00.000Z", 3);
        a.is_returning = true;
        a.email = Some("fleet@acme.com.au".into());
        let b = visitor("1.1.1.1", "2026-03-09T11:00:00.000Z", 1);
        let c = visitor("2.2.2.2", "2026-03-10T09:00:00.000Z", 2);
        let d = visitor("3.3.3.3", "2026-03-10T09:30:00.000Z", 2);

        let range = DateRange::resolve(None, None, None, now()).unwrap();
        let report = build_report(&[a, b, c, d], &range);

        assert_eq!(report.overview.total_visitors, 4);
        assert_eq!(report.overview.unique_visitors, 3);
        assert_eq!(report.overview.total_page_views, 8);
        assert_eq!(report.overview.returning_visitors, 1);
        assert_eq!(report.overview.new_visitors, 3);
        assert_eq!(report.overview.conversion_rate, 25.0);
        assert_eq!(report.overview.avg_page_views, 2.0);

        assert_eq!(report.daily_trend.len(), 2);
        assert_eq!(report.daily_trend[0].date, "2026-03-09");
        assert_eq!(report.daily_trend[0].visitors, 2);
        assert_eq!(report.daily_trend[0].page_views, 4);
        assert_eq!(report.email_domains[0].domain, "acme.com.au");
    }

    #[test]
    fn test_empty_report_has_no_nan() {
        let range = DateRange::resolve(None, None, None, now()).unwrap();
        let report = build_report(&[], &range);
        assert_eq!(report.overview.conversion_rate, 0.0);
        assert_eq!(report.overview.avg_page_views, 0.0);
        assert!(report.top_pages.is_empty());
    }

    #[test]
    fn test_top_pages_sum_views_and_cap() {
        let mut visitors = Vec::new();
        for i in 0..12 {
            let mut v = visitor("9.9.9.9", "2026-03-09T10:00:00.000Z", 1);
            v.current_page = Some(format!("/page-{}", i));
            visitors.push(v);
        }
        let mut hot = visitor("8.8.8.8", "2026-03-09T10:00:00.000Z", 5);
        hot.current_page = Some("/page-3".into());
        visitors.push(hot);

        let range = DateRange::resolve(None, None, None, now()).unwrap();
        let pages = build_report(&visitors, &range).top_pages;
        assert_eq!(pages.len(), 10);
        assert_eq!(pages[0], PageViews { page: "/page-3".into(), views: 6 });
    }

    #[test]
    fn test_breakdowns_rank_by_count() {
        let mut visitors = Vec::new();
        for browser in ["Chrome", "Chrome", "Firefox"] {
            let mut v = visitor("1.1.1.1", "2026-03-09T10:00:00.000Z", 1);
            v.browser = Some(browser.into());
            visitors.push(v);
        }
        visitors.push(visitor("1.1.1.1", "2026-03-09T10:00:00.000Z", 1));

        let range = DateRange::resolve(None, None, None, now()).unwrap();
        let report = build_report(&visitors, &range);
        assert_eq!(report.browsers[0], NamedCount { name: "Chrome".into(), count: 2 });
        assert_eq!(report.browsers.len(), 3);
        assert_eq!(report.device_types, vec![NamedCount { name: "desktop".into(), count: 4 }]);
    }

    #[test]
    fn test_classify_referrer_uses_parsed_host() {
        // A backslash ends the authority, so the host is spam.example
        assert_eq!(classify_referrer(Some("https://spam.example\\@google.com/")), TrafficSource::Referral);
        assert_eq!(classify_referrer(Some("https://user@google.com/search")), TrafficSource::Search);
        assert_eq!(classify_referrer(Some("https://www.google.com:443/")), TrafficSource::Search);
        assert_eq!(classify_referrer(Some("not a url")), TrafficSource::Referral);
        assert_eq!(classify_referrer(Some("google.com")), TrafficSource::Referral);
    }

    #[test]
    fn test_classify_referrer() {
        assert_eq!(classify_referrer(None), TrafficSource::Direct);
        assert_eq!(classify_referrer(Some("  ")), TrafficSource::Direct);
        assert_eq!(classify_referrer(Some("https://www.google.com.au/search?q=ute+tray")), TrafficSource::Search);
        assert_eq!(classify_referrer(Some("https://duckduckgo.com/")), TrafficSource::Search);
        assert_eq!(classify_referrer(Some("https://m.facebook.com/story")), TrafficSource::Social);
        assert_eq!(classify_referrer(Some("https://t.co/abc")), TrafficSource::Social);
        assert_eq!(classify_referrer(Some("https://mail.google.com/mail/u/0")), TrafficSource::Email);
        assert_eq!(
            classify_referrer(Some("https://news.example.com/?utm_medium=email")),
            TrafficSource::Email
        );
        assert_eq!(classify_referrer(Some("https://fleetforum.net/thread/9")), TrafficSource::Referral);
        assert_eq!(classify_referrer(Some("https://notgoogle.io/")), TrafficSource::Referral);
        assert_eq!(classify_referrer(Some("https://WWW.Bing.com/search?q=canopy")), TrafficSource::Search);
    }
}
