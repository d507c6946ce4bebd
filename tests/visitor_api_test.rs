mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use bson::oid::ObjectId;
use serde_json::{json, Value};

use common::TestApp;
use servicebody_backend::model::visitor::{DeviceType, Visitor};
use servicebody_backend::util::time::now_iso;

const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

fn track_request(ip: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/visitors/track")
        .header("content-type", "application/json")
        .header("user-agent", IPHONE)
        .header("x-forwarded-for", ip);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn session_from(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("sessionId="))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_track_creates_then_increments_same_record() {
    let app = TestApp::new();

    let (status, body, resp) = app
        .send(track_request("198.51.100.1", None, &json!({ "currentPage": "/" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["isReturning"], false);
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(set_cookie.contains("HttpOnly"));
    let session = session_from(&set_cookie);
    assert_eq!(body["data"]["sessionId"], session);

    {
        let rows = app.visitors.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page_views, 1);
        assert!(!rows[0].is_returning);
        assert_eq!(rows[0].entry_page.as_deref(), Some("/"));
        assert_eq!(rows[0].device_type, DeviceType::Mobile);
    }

    // Same session from a different network
    let cookie = format!("sessionId={}", session);
    let (status, body, _) = app
        .send(track_request("192.0.2.50", Some(&cookie), &json!({ "currentPage": "/services" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isReturning"], true);
    assert_eq!(body["data"]["sessionId"], session);

    let rows = app.visitors.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].page_views, 2);
    assert!(rows[0].is_returning);
    assert_eq!(rows[0].previous_page.as_deref(), Some("/"));
    assert_eq!(rows[0].current_page.as_deref(), Some("/services"));
    assert_eq!(body["data"]["visitorId"], rows[0].id.unwrap().to_hex());
}

#[tokio::test]
async fn test_track_rejects_invalid_email() {
    let app = TestApp::new();
    let (status, body, _) = app
        .send(track_request("198.51.100.1", None, &json!({ "email": "nope", "consentGiven": true })))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(app.visitors.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_visitor_routes_require_token() {
    let app = TestApp::new();
    for uri in ["/visitors/analytics", "/visitors/recent", "/visitors/abc"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body, _) = app.send(req).await;
        assert_eq!(status, 401, "{}", uri);
        assert_eq!(body["error"], "Unauthorized");
    }
}

#[tokio::test]
async fn test_analytics_report() {
    let app = TestApp::new();
    let now = now_iso();
    {
        let mut rows = app.visitors.rows.lock().unwrap();
        let mut a = Visitor::new("10.0.0.1".into(), &now);
        a.id = Some(ObjectId::new());
        a.page_views = 3;
        a.referrer = Some("https://www.google.com/search?q=ute".into());
        a.current_page = Some("/services".into());
        a.email = Some("buyer@fleet.com.au".into());
        a.country = "AU".into();
        let mut b = Visitor::new("10.0.0.2".into(), &now);
        b.id = Some(ObjectId::new());
        b.is_returning = true;
        b.current_page = Some("/".into());
        b.device_type = DeviceType::Mobile;
        let mut old = Visitor::new("10.0.0.3".into(), "2020-01-01T00:00:00.000Z");
        old.id = Some(ObjectId::new());
        rows.extend([a, b, old]);
    }

    let (status, body) = app.admin("GET", "/visitors/analytics?period=7d", None).await;
    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["overview"]["totalVisitors"], 2);
    assert_eq!(data["overview"]["uniqueVisitors"], 2);
    assert_eq!(data["overview"]["totalPageViews"], 4);
    assert_eq!(data["overview"]["returningVisitors"], 1);
    assert_eq!(data["overview"]["newVisitors"], 1);
    assert_eq!(data["trafficSources"]["search"], 1);
    assert_eq!(data["trafficSources"]["direct"], 1);
    assert_eq!(data["topPages"][0], json!({ "page": "/services", "views": 3 }));
    assert_eq!(data["emailDomains"][0], json!({ "domain": "fleet.com.au", "count": 1 }));
    assert_eq!(data["period"]["label"], "7d");

    let (status, _) = app.admin("GET", "/visitors/analytics?startDate=yesterday", None).await;
    assert_eq!(status, 400);

    let (status, body) = app
        .admin("GET", "/visitors/analytics?startDate=2019-12-31&endDate=2020-01-01", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["overview"]["totalVisitors"], 1);
    assert_eq!(body["data"]["period"]["label"], "custom");
}

#[tokio::test]
async fn test_recent_visitors_hide_session_and_user_agent() {
    let app = TestApp::new();
    app.send(track_request("198.51.100.1", None, &json!({ "currentPage": "/" }))).await;
    app.send(track_request("198.51.100.2", None, &json!({ "currentPage": "/about" }))).await;

    let (status, body) = app.admin("GET", "/visitors/recent?limit=1", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["pagination"], json!({ "page": 1, "limit": 1, "total": 2, "pages": 2 }));
    let first = &body["visitors"][0];
    assert!(first.get("userAgent").is_none());
    assert!(first.get("sessionId").is_none());

    let id = first["_id"].as_str().unwrap();
    let (status, body) = app.admin("GET", &format!("/visitors/{}", id), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["visitor"]["userAgent"], IPHONE);
    assert!(body["visitor"]["sessionId"].is_string());
}

#[tokio::test]
async fn test_visitor_details_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .admin("GET", &format!("/visitors/{}", ObjectId::new().to_hex()), None)
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

fn page_request(path: &str, ip: &str, user_agent: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", ip)
        .header("user-agent", user_agent)
        .header(header::ACCEPT, BROWSER_ACCEPT)
        .body(Body::empty())
        .unwrap()
}

async fn wait_for_rows(app: &TestApp, count: usize) -> Vec<Visitor> {
    for _ in 0..50 {
        let rows = app.visitors.rows.lock().unwrap().clone();
        if rows.len() >= count {
            return rows;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    app.visitors.rows.lock().unwrap().clone()
}

#[tokio::test]
async fn test_tracker_middleware_records_site_pages_only() {
    let app = TestApp::new();

    let mut req = page_request("/services/ute-canopy", "203.0.113.77", IPHONE);
    req.headers_mut().insert(header::COOKIE, "sessionId=known-session".parse().unwrap());
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, 404);

    let req = page_request("/health", "203.0.113.77", IPHONE);
    let (status, _, _) = app.send(req).await;
    assert_eq!(status, 200);

    let recorded = wait_for_rows(&app, 1).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].ip_address, "203.0.113.77");
    assert_eq!(recorded[0].session_id.as_deref(), Some("known-session"));
    assert_eq!(recorded[0].device_type, DeviceType::Mobile);
    assert!(!recorded[0].is_returning);
}

#[tokio::test]
async fn test_tracker_marks_second_hit_from_same_ip_returning() {
    let app = TestApp::new();

    app.send(page_request("/", "198.51.100.40", IPHONE)).await;
    let first = wait_for_rows(&app, 1).await;
    assert_eq!(first.len(), 1);
    assert!(!first[0].is_returning);

    app.send(page_request("/services", "198.51.100.40", IPHONE)).await;
    let rows = wait_for_rows(&app, 2).await;
    assert_eq!(rows.len(), 2);
    let second = rows.iter().find(|v| v.id != first[0].id).unwrap();
    assert!(second.is_returning);
    assert_eq!(second.current_page.as_deref(), Some("/services"));

    // A different address is a new visitor
    app.send(page_request("/", "198.51.100.41", IPHONE)).await;
    let rows = wait_for_rows(&app, 3).await;
    let other = rows.iter().find(|v| v.ip_address == "198.51.100.41").unwrap();
    assert!(!other.is_returning);
}

#[tokio::test]
async fn test_tracker_ignores_crawlers_and_non_page_requests() {
    let app = TestApp::new();

    app.send(page_request("/", "66.249.66.1", GOOGLEBOT)).await;

    let req = Request::builder()
        .uri("/wp-login.php")
        .header("x-forwarded-for", "192.0.2.99")
        .header("user-agent", IPHONE)
        .body(Body::empty())
        .unwrap();
    app.send(req).await;

    let req = Request::builder()
        .method("POST")
        .uri("/xmlrpc.php")
        .header("x-forwarded-for", "192.0.2.99")
        .header(header::ACCEPT, BROWSER_ACCEPT)
        .body(Body::empty())
        .unwrap();
    app.send(req).await;

    // Control hit, so the spawned tasks have had time to run
    app.send(page_request("/about", "203.0.113.5", IPHONE)).await;
    let rows = wait_for_rows(&app, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let rows_after = app.visitors.rows.lock().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows_after.len(), 1);
    assert_eq!(rows_after[0].ip_address, "203.0.113.5");
}

#[tokio::test]
async fn test_recent_visitors_rejects_page_beyond_offset_range() {
    let app = TestApp::new();
    let (status, body) = app
        .admin("GET", "/visitors/recent?page=9223372036854775807&limit=100", None)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Validation");
}
