//! Provenance captured from an incoming request: client address, browser
//! headers and the session cookie.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use cookie::Cookie;

use crate::model::visitor::UNKNOWN_LOCATION;

pub const SESSION_COOKIE: &str = "sessionId";
pub const UNKNOWN_IP: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub page_url: Option<String>,
    pub path: String,
    pub language: Option<String>,
    pub session_id: Option<String>,
    pub country: String,
    pub city: String,
    pub region: String,
}

impl RequestMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let host = header(headers, "x-forwarded-host").or_else(|| header(headers, "host"));
        let scheme = header(headers, "x-forwarded-proto").unwrap_or_else(|| "http".to_string());
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let page_url = host.map(|host| format!("{}://{}{}", scheme, host, path_and_query));

        RequestMeta {
            ip: client_ip(headers, peer),
            user_agent: header(headers, "user-agent"),
            referrer: header(headers, "referer").or_else(|| header(headers, "referrer")),
            page_url,
            path: parts.uri.path().to_string(),
            language: header(headers, "accept-language")
                .and_then(|l| l.split(',').next().map(|s| s.trim().to_string()))
                .filter(|l| !l.is_empty()),
            session_id: session_cookie(headers),
            country: header(headers, "cf-ipcountry")
                .or_else(|| header(headers, "x-vercel-ip-country"))
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            city: header(headers, "x-vercel-ip-city").unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            region: header(headers, "x-vercel-ip-country-region")
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        }
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_parts(parts))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Proxy headers first (`x-forwarded-for` first hop, `x-real-ip`,
/// `cf-connecting-ip`), then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<String>) -> String {
    header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|v| !v.is_empty())
        .or_else(|| header(headers, "x-real-ip"))
        .or_else(|| header(headers, "cf-connecting-ip"))
        .or(peer)
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/services/ute?ref=ad");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers, Some("127.0.0.1".into())), "203.0.113.7");
    }

    #[test]
    fn test_ip_fallback_chain() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.9"));
        assert_eq!(client_ip(&headers, Some("127.0.0.1".into())), "198.51.100.9");
        assert_eq!(client_ip(&HeaderMap::new(), Some("127.0.0.1".into())), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), UNKNOWN_IP);
    }

    #[test]
    fn test_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; sessionId=abc-123; x=y"));
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_from_parts_builds_page_url_and_location() {
        let meta = RequestMeta::from_parts(&parts(&[
            ("host", "bodies.example.com"),
            ("x-forwarded-proto", "https"),
            ("user-agent", "Mozilla/5.0"),
            ("referer", "https://www.google.com/"),
            ("cf-ipcountry", "AU"),
            ("accept-language", "en-AU,en;q=0.9"),
        ]));
        assert_eq!(meta.page_url.as_deref(), Some("https://bodies.example.com/services/ute?ref=ad"));
        assert_eq!(meta.path, "/services/ute");
        assert_eq!(meta.country, "AU");
        assert_eq!(meta.city, UNKNOWN_LOCATION);
        assert_eq!(meta.language.as_deref(), Some("en-AU"));
        assert_eq!(meta.referrer.as_deref(), Some("https://www.google.com/"));
        assert_eq!(meta.ip, UNKNOWN_IP);
    }
}
