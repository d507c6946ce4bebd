use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::SET_COOKIE, HeaderValue},
    response::IntoResponse,
    Json,
};
use cookie::{time::Duration, Cookie, SameSite};
use tracing::{debug, error};

use crate::config::Environment;
use crate::dto::visitor_dto::{
    AnalyticsQuery, AnalyticsResponse, RecentVisitorsQuery, TrackVisitorRequest, TrackVisitorResponse,
    VisitorResponse,
};
use crate::handler::{json_body, ApiState};
use crate::service::visitor_service::VisitorService;
use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::request_meta::{RequestMeta, SESSION_COOKIE};

pub type VisitorState = ApiState<dyn VisitorService>;

const SESSION_MAX_AGE_HOURS: i64 = 24;

/// `Set-Cookie` value for the tracking session.
pub fn session_cookie_header(session_id: &str, environment: Environment) -> Result<HeaderValue, HandlerError> {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .max_age(Duration::hours(SESSION_MAX_AGE_HOURS))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(environment.is_production())
        .build();
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
        error!("Session cookie not encodable: {}", e);
        HandlerError::new(HandlerErrorKind::Internal, "Failed to set session cookie")
    })
}

// Track (public)
pub async fn track_visitor_handler(
    State(state): State<VisitorState>,
    meta: RequestMeta,
    payload: Result<Json<TrackVisitorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let request = json_body(payload)?;
    let data = state.service.track(request, meta).await.map_err(|e| {
        error!("Visitor tracking failed: {}", e);
        state.error(e)
    })?;
    debug!(session_id = %data.session_id, "Tracking session");
    let cookie = session_cookie_header(&data.session_id, state.environment)?;
    Ok(([(SET_COOKIE, cookie)], Json(TrackVisitorResponse { success: true, data })))
}

pub async fn analytics_handler(
    State(state): State<VisitorState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let data = state.service.get_analytics(query).await.map_err(|e| state.error(e))?;
    Ok(Json(AnalyticsResponse { success: true, data }))
}

pub async fn recent_visitors_handler(
    State(state): State<VisitorState>,
    Query(query): Query<RecentVisitorsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let res = state.service.get_recent_visitors(query).await.map_err(|e| state.error(e))?;
    Ok(Json(res))
}

pub async fn visitor_details_handler(
    State(state): State<VisitorState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let visitor = state.service.get_visitor_details(&id).await.map_err(|e| state.error(e))?;
    Ok(Json(VisitorResponse { success: true, visitor }))
}
