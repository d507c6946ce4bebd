use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::pagination::{PageRequest, Pagination};
use crate::dto::visitor_dto::{
    AnalyticsQuery, RecentVisitorsQuery, RecentVisitorsResponse, TrackResult, TrackVisitorRequest, VisitorView,
};
use crate::model::visitor::{Visitor, UNKNOWN_LOCATION};
use crate::repository::visitor_repo::{VisitorIdentity, VisitorRepository};
use crate::util::analytics::{build_report, AnalyticsReport, DateRange};
use crate::util::error::ServiceError;
use crate::util::request_meta::RequestMeta;
use crate::util::time::now_iso;
use crate::util::user_agent::{fingerprint, parse_user_agent};

pub const DEFAULT_RECENT_LIMIT: u64 = 20;

#[async_trait]
pub trait VisitorService: Send + Sync {
    /// Passive page hit recorded by the tracking middleware. Crawlers are not
    /// recorded and yield `None`.
    async fn record_hit(&self, meta: RequestMeta) -> Result<Option<Visitor>, ServiceError>;
    /// Explicit telemetry from the site script.
    async fn track(&self, request: TrackVisitorRequest, meta: RequestMeta) -> Result<TrackResult, ServiceError>;
    async fn get_analytics(&self, query: AnalyticsQuery) -> Result<AnalyticsReport, ServiceError>;
    async fn get_recent_visitors(&self, query: RecentVisitorsQuery) -> Result<RecentVisitorsResponse, ServiceError>;
    async fn get_visitor_details(&self, id: &str) -> Result<VisitorView, ServiceError>;
}

pub struct VisitorServiceImpl {
    visitors: Arc<dyn VisitorRepository>,
}

impl VisitorServiceImpl {
    pub fn new(visitors: Arc<dyn VisitorRepository>) -> Self {
        Self { visitors }
    }
}

/// Session id for a passive hit: the cookie when present, otherwise a
/// fingerprint of the address and arrival time.
pub fn hit_session_id(meta: &RequestMeta, now: &str) -> String {
    meta.session_id
        .clone()
        .unwrap_or_else(|| fingerprint(&format!("{}|{}", meta.ip, now)))
}

/// Device, location and language data taken from the request itself.
fn apply_request_data(visitor: &mut Visitor, meta: &RequestMeta) {
    if let Some(ua) = meta.user_agent.as_deref() {
        let parsed = parse_user_agent(ua);
        visitor.user_agent = Some(ua.to_string());
        visitor.device_type = parsed.device_type;
        visitor.browser = parsed.browser;
        visitor.browser_version = parsed.browser_version;
        visitor.os = parsed.os;
        visitor.os_version = parsed.os_version;
    }
    if meta.language.is_some() {
        visitor.language = meta.language.clone();
    }
    // A known location is never overwritten with "Unknown".
    for (slot, value) in [
        (&mut visitor.country, &meta.country),
        (&mut visitor.city, &meta.city),
        (&mut visitor.region, &meta.region),
    ] {
        if !value.is_empty() && value != UNKNOWN_LOCATION {
            *slot = value.clone();
        }
    }
}

fn apply_telemetry(visitor: &mut Visitor, request: &TrackVisitorRequest) {
    macro_rules! copy {
        ($($field:ident),+) => {
            $(if request.$field.is_some() {
                visitor.$field = request.$field.clone();
            })+
        };
    }
    copy!(
        screen_resolution,
        viewport_size,
        color_depth,
        pixel_ratio,
        device_memory,
        hardware_concurrency,
        connection_type,
        connection_speed,
        language,
        timezone,
        visit_duration
    );
}

/// Identity fields are only kept once the visitor has consented.
fn apply_consented_identity(visitor: &mut Visitor, request: &TrackVisitorRequest, now: &str) {
    if !request.consent_given {
        return;
    }
    if !visitor.consent_given {
        visitor.consent_timestamp = Some(now.to_string());
    }
    visitor.consent_given = true;
    if let Some(email) = request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        visitor.email = Some(email.to_lowercase());
    }
    if let Some(name) = request.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        visitor.name = Some(name.to_string());
    }
    if let Some(social) = &request.social_accounts {
        visitor.social_accounts = social.clone();
    }
}

/// Fold one tracking call into `existing`, or start a new record.
pub fn merge_track(
    existing: Option<Visitor>,
    request: &TrackVisitorRequest,
    meta: &RequestMeta,
    session_id: &str,
    now: &str,
) -> Visitor {
    let current_page = request
        .current_page
        .clone()
        .or_else(|| meta.page_url.clone());
    let referrer = request.referrer.clone().or_else(|| meta.referrer.clone());

    let mut visitor = match existing {
        Some(mut visitor) => {
            visitor.page_views += 1;
            visitor.is_returning = true;
            visitor.previous_page = visitor.current_page.take();
            visitor.ip_address = meta.ip.clone();
            visitor
        }
        None => {
            let mut visitor = Visitor::new(meta.ip.clone(), now);
            visitor.entry_page = current_page.clone();
            visitor
        }
    };

    visitor.session_id = Some(session_id.to_string());
    visitor.current_page = current_page;
    if referrer.is_some() {
        visitor.referrer = referrer;
    }
    apply_request_data(&mut visitor, meta);
    apply_telemetry(&mut visitor, request);
    apply_consented_identity(&mut visitor, request, now);

    visitor.last_activity = now.to_string();
    visitor.last_seen = now.to_string();
    visitor.updated_at = now.to_string();
    visitor
}

#[async_trait]
impl VisitorService for VisitorServiceImpl {
    #[instrument(skip_all, fields(ip = %meta.ip, path = %meta.path))]
    async fn record_hit(&self, meta: RequestMeta) -> Result<Option<Visitor>, ServiceError> {
        if meta.user_agent.as_deref().is_some_and(|ua| parse_user_agent(ua).is_bot) {
            debug!("Skipping crawler hit");
            return Ok(None);
        }
        let now = now_iso();
        let previous = self.visitors.find_latest_by_ip(&meta.ip).await?;

        let mut visitor = Visitor::new(meta.ip.clone(), &now);
        visitor.session_id = Some(hit_session_id(&meta, &now));
        visitor.is_returning = previous.is_some();
        visitor.referrer = meta.referrer.clone();
        visitor.current_page = meta.page_url.clone().or_else(|| Some(meta.path.clone()));
        visitor.entry_page = visitor.current_page.clone();
        apply_request_data(&mut visitor, &meta);

        let stored = self.visitors.insert(visitor).await?;
        debug!(returning = stored.is_returning, "Page hit recorded");
        Ok(Some(stored))
    }

    #[instrument(skip_all, fields(ip = %meta.ip))]
    async fn track(&self, request: TrackVisitorRequest, meta: RequestMeta) -> Result<TrackResult, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::InvalidInput(format!("Validation error: {}", e)))?;

        let now = now_iso();
        let session_id = meta
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let email = request
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        let identity = VisitorIdentity {
            ip_address: meta.ip.clone(),
            session_id: Some(session_id.clone()),
            email,
        };

        let existing = self.visitors.find_match(&identity).await?;
        let visitor = merge_track(existing, &request, &meta, &session_id, &now);
        let visitor = if visitor.id.is_some() {
            self.visitors.update(&visitor).await?;
            visitor
        } else {
            self.visitors.insert(visitor).await?
        };

        let visitor_id = visitor.id.map(|id| id.to_hex()).unwrap_or_default();
        info!(visitor_id = %visitor_id, returning = visitor.is_returning, "Visitor tracked");
        Ok(TrackResult {
            visitor_id,
            session_id,
            is_returning: visitor.is_returning,
        })
    }

    #[instrument(skip(self))]
    async fn get_analytics(&self, query: AnalyticsQuery) -> Result<AnalyticsReport, ServiceError> {
        let range = DateRange::resolve(
            query.period.as_deref(),
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            Utc::now(),
        )
        .map_err(ServiceError::InvalidInput)?;
        let visitors = self.visitors.find_in_range(&range).await?;
        debug!("Building analytics over {} visitors ({})", visitors.len(), range.label);
        Ok(build_report(&visitors, &range))
    }

    #[instrument(skip(self))]
    async fn get_recent_visitors(&self, query: RecentVisitorsQuery) -> Result<RecentVisitorsResponse, ServiceError> {
        let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_RECENT_LIMIT)
            .map_err(ServiceError::InvalidInput)?;
        let total = self.visitors.count().await?;
        let visitors = self.visitors.list_recent(page.skip(), page.limit as i64).await?;
        Ok(RecentVisitorsResponse {
            success: true,
            visitors: visitors.into_iter().map(VisitorView::summary).collect(),
            pagination: Pagination::new(page.page, page.limit, total),
        })
    }

    #[instrument(skip(self))]
    async fn get_visitor_details(&self, id: &str) -> Result<VisitorView, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("Visitor not found: {}", id));
        let oid = ObjectId::parse_str(id.trim()).map_err(|_| not_found())?;
        self.visitors
            .find_by_id(&oid)
            .await?
            .map(VisitorView::full)
            .ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::visitor::{DeviceType, SocialAccounts};

    const T0: &str = "2026-02-01T08:00:00.000Z";
    const T1: &str = "2026-02-01T08:05:00.000Z";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    fn meta() -> RequestMeta {
        RequestMeta {
            ip: "198.51.100.7".into(),
            user_agent: Some(IPHONE.into()),
            referrer: Some("https://www.google.com/".into()),
            path: "/api/visitors/track".into(),
            country: "AU".into(),
            city: UNKNOWN_LOCATION.into(),
            region: UNKNOWN_LOCATION.into(),
            ..RequestMeta::default()
        }
    }

    #[test]
    fn test_new_visitor_from_track() {
        let req = TrackVisitorRequest {
            current_page: Some("/services".into()),
            screen_resolution: Some("390x844".into()),
            ..Default::default()
        };
        let v = merge_track(None, &req, &meta(), "s1", T0);
        assert_eq!(v.page_views, 1);
        assert!(!v.is_returning);
        assert_eq!(v.entry_page.as_deref(), Some("/services"));
        assert_eq!(v.current_page.as_deref(), Some("/services"));
        assert_eq!(v.previous_page, None);
        assert_eq!(v.session_id.as_deref(), Some("s1"));
        assert_eq!(v.device_type, DeviceType::Mobile);
        assert_eq!(v.country, "AU");
        assert_eq!(v.city, UNKNOWN_LOCATION);
        assert_eq!(v.screen_resolution.as_deref(), Some("390x844"));
        assert_eq!(v.referrer.as_deref(), Some("https://www.google.com/"));
    }

    #[test]
    fn test_returning_visitor_increments_and_shifts_pages() {
        let first = TrackVisitorRequest { current_page: Some("/".into()), ..Default::default() };
        let mut stored = merge_track(None, &first, &meta(), "s1", T0);
        stored.id = Some(ObjectId::new());
        stored.city = "Brisbane".into();

        let second = TrackVisitorRequest {
            current_page: Some("/contact".into()),
            referrer: Some("https://facebook.com/".into()),
            ..Default::default()
        };
        let v = merge_track(Some(stored), &second, &meta(), "s1", T1);
        assert_eq!(v.page_views, 2);
        assert!(v.is_returning);
        assert_eq!(v.previous_page.as_deref(), Some("/"));
        assert_eq!(v.current_page.as_deref(), Some("/contact"));
        assert_eq!(v.entry_page.as_deref(), Some("/"));
        assert_eq!(v.referrer.as_deref(), Some("https://facebook.com/"));
        assert_eq!(v.city, "Brisbane");
        assert_eq!(v.created_at, T0);
        assert_eq!(v.last_seen, T1);
    }

    #[test]
    fn test_identity_requires_consent() {
        let req = TrackVisitorRequest {
            email: Some("Owner@Fleet.com".into()),
            name: Some("Owner".into()),
            social_accounts: Some(SocialAccounts { linkedin: Some("owner".into()), ..Default::default() }),
            ..Default::default()
        };
        let v = merge_track(None, &req, &meta(), "s1", T0);
        assert_eq!(v.email, None);
        assert!(v.social_accounts.is_empty());
        assert!(!v.consent_given);

        let req = TrackVisitorRequest { consent_given: true, ..req };
        let v = merge_track(None, &req, &meta(), "s1", T0);
        assert_eq!(v.email.as_deref(), Some("owner@fleet.com"));
        assert_eq!(v.name.as_deref(), Some("Owner"));
        assert_eq!(v.social_accounts.linkedin.as_deref(), Some("owner"));
        assert_eq!(v.consent_timestamp.as_deref(), Some(T0));

        let again = merge_track(Some(v), &req, &meta(), "s1", T1);
        assert_eq!(again.consent_timestamp.as_deref(), Some(T0));
    }

    #[test]
    fn test_hit_session_prefers_cookie() {
        let mut m = meta();
        let generated = hit_session_id(&m, T0);
        assert_eq!(generated.len(), 16);
        assert_eq!(generated, hit_session_id(&m, T0));
        assert_ne!(generated, hit_session_id(&m, T1));

        m.session_id = Some("cookie-session".into());
        assert_eq!(hit_session_id(&m, T0), "cookie-session");
    }
}
