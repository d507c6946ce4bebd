use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::ACCEPT, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::service::visitor_service::VisitorService;
use crate::util::request_meta::RequestMeta;

pub struct VisitorTrackerState {
    pub service: Arc<dyn VisitorService>,
    pub excluded_prefixes: Vec<String>,
}

pub fn is_tracked(path: &str, excluded_prefixes: &[String]) -> bool {
    !excluded_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// Only browser page navigations count: GET requests that accept HTML.
pub fn is_page_view(method: &Method, headers: &HeaderMap) -> bool {
    *method == Method::GET
        && headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|accept| accept.contains("text/html"))
}

/// Records a page hit for every tracked page view on a detached task. The
/// request itself never waits on or fails because of tracking.
pub async fn visitor_tracker(
    State(state): State<Arc<VisitorTrackerState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_tracked(req.uri().path(), &state.excluded_prefixes) && is_page_view(req.method(), req.headers()) {
        let (parts, body) = req.into_parts();
        let meta = RequestMeta::from_parts(&parts);
        let service = state.service.clone();
        tokio::spawn(async move {
            if let Err(e) = service.record_hit(meta).await {
                warn!("Visitor tracking failed: {}", e);
            }
        });
        return next.run(Request::from_parts(parts, body)).await;
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::app_conf::DEFAULT_TRACKER_EXCLUDED_PREFIXES;
    use axum::http::HeaderValue;

    #[test]
    fn test_excluded_prefixes() {
        let prefixes: Vec<String> = DEFAULT_TRACKER_EXCLUDED_PREFIXES.iter().map(|s| s.to_string()).collect();
        assert!(is_tracked("/", &prefixes));
        assert!(is_tracked("/services/ute-canopy", &prefixes));
        assert!(!is_tracked("/contacts/submit", &prefixes));
        assert!(!is_tracked("/visitors/track", &prefixes));
        assert!(!is_tracked("/api/anything", &prefixes));
        assert!(!is_tracked("/health", &prefixes));
    }

    #[test]
    fn test_only_html_gets_are_page_views() {
        let mut html = HeaderMap::new();
        html.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"));
        assert!(is_page_view(&Method::GET, &html));
        assert!(!is_page_view(&Method::POST, &html));
        assert!(!is_page_view(&Method::HEAD, &html));
        assert!(!is_page_view(&Method::GET, &HeaderMap::new()));

        let mut json = HeaderMap::new();
        json.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!is_page_view(&Method::GET, &json));
    }
}
