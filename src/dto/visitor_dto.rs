use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::pagination::Pagination;
use crate::model::visitor::{SocialAccounts, Visitor};

/// Client telemetry posted by the site's tracking script.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitorRequest {
    #[validate(length(max = 32))]
    pub screen_resolution: Option<String>,
    #[validate(length(max = 32))]
    pub viewport_size: Option<String>,
    pub color_depth: Option<u32>,
    pub pixel_ratio: Option<f64>,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
    #[validate(length(max = 32))]
    pub connection_type: Option<String>,
    #[validate(length(max = 32))]
    pub connection_speed: Option<String>,
    #[validate(length(max = 35))]
    pub language: Option<String>,
    #[validate(length(max = 64))]
    pub timezone: Option<String>,
    #[validate(length(max = 2048))]
    pub current_page: Option<String>,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    /// Seconds spent on the previous page
    pub visit_duration: Option<i64>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub social_accounts: Option<SocialAccounts>,
    #[serde(default)]
    pub consent_given: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    pub visitor_id: String,
    pub session_id: String,
    pub is_returning: bool,
}

#[derive(Debug, Serialize)]
pub struct TrackVisitorResponse {
    pub success: bool,
    pub data: TrackResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentVisitorsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A stored visitor with its id rendered as hex.
#[derive(Debug, Clone, Serialize)]
pub struct VisitorView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub visitor: Visitor,
}

impl VisitorView {
    pub fn full(mut visitor: Visitor) -> Self {
        let id = visitor.id.take().map(|id| id.to_hex()).unwrap_or_default();
        VisitorView { id, visitor }
    }

    /// Listing form: user agent and session id are not exposed.
    pub fn summary(mut visitor: Visitor) -> Self {
        visitor.user_agent = None;
        visitor.session_id = None;
        Self::full(visitor)
    }
}

#[derive(Debug, Serialize)]
pub struct RecentVisitorsResponse {
    pub success: bool,
    pub visitors: Vec<VisitorView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct VisitorResponse {
    pub success: bool,
    pub visitor: VisitorView,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}
