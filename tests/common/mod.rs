#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use bson::oid::ObjectId;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use servicebody_backend::app::app::{build_router, AppServices};
use servicebody_backend::config::{AppConfig, JwtConfig};
use servicebody_backend::model::catalog::CatalogKind;
use servicebody_backend::model::contact::Contact;
use servicebody_backend::model::user::{User, ADMIN_ROLE};
use servicebody_backend::model::visitor::Visitor;
use servicebody_backend::repository::catalog_repo::CatalogLookup;
use servicebody_backend::repository::contact_repo::{ContactFilter, ContactRepository, ContactSort};
use servicebody_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use servicebody_backend::repository::user_repo::UserRepository;
use servicebody_backend::repository::visitor_repo::{VisitorIdentity, VisitorRepository};
use servicebody_backend::service::contact_service::ContactServiceImpl;
use servicebody_backend::service::notification_service::NotificationService;
use servicebody_backend::service::user_service::UserServiceImpl;
use servicebody_backend::service::visitor_service::VisitorServiceImpl;
use servicebody_backend::util::analytics::DateRange;
use servicebody_backend::util::email::{EmailError, EmailMessage, EmailSender};
use servicebody_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use servicebody_backend::util::password::{PasswordUtils, PasswordUtilsImpl};

pub const ADMIN_INBOX: &str = "sales@bodies.example.com";
pub const ADMIN_EMAIL: &str = "admin@bodies.example.com";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

#[derive(Default)]
pub struct MemContacts {
    pub rows: Mutex<Vec<Contact>>,
}

#[async_trait]
impl ContactRepository for MemContacts {
    async fn insert(&self, mut contact: Contact) -> RepositoryResult<Contact> {
        contact.id.get_or_insert_with(ObjectId::new);
        self.rows.lock().unwrap().push(contact.clone());
        Ok(contact)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Contact>> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id.as_ref() == Some(id)).cloned())
    }

    async fn list(&self, filter: &ContactFilter, sort: ContactSort, skip: u64, limit: i64) -> RepositoryResult<Vec<Contact>> {
        let mut rows: Vec<Contact> = self.rows.lock().unwrap().iter().filter(|c| filter.matches(c)).cloned().collect();
        rows.sort_by(|a, b| sort.compare(a, b));
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn count(&self, filter: &ContactFilter) -> RepositoryResult<u64> {
        Ok(self.rows.lock().unwrap().iter().filter(|c| filter.matches(c)).count() as u64)
    }

    async fn update(&self, contact: &Contact) -> RepositoryResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| c.id == contact.id) {
            Some(row) => {
                *row = contact.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("Contact not found")),
        }
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.id.as_ref() != Some(id));
        if rows.len() == before {
            return Err(RepositoryError::not_found("Contact not found"));
        }
        Ok(())
    }

    async fn count_by_enquiry_type(&self) -> RepositoryResult<Vec<(String, u64)>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for c in self.rows.lock().unwrap().iter() {
            *counts.entry(c.enquiry_type.as_str().to_string()).or_default() += 1;
        }
        let mut out: Vec<(String, u64)> = counts.into_iter().collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(out)
    }
}

#[derive(Default)]
pub struct MemVisitors {
    pub rows: Mutex<Vec<Visitor>>,
}

#[async_trait]
impl VisitorRepository for MemVisitors {
    async fn insert(&self, mut visitor: Visitor) -> RepositoryResult<Visitor> {
        visitor.id.get_or_insert_with(ObjectId::new);
        self.rows.lock().unwrap().push(visitor.clone());
        Ok(visitor)
    }

    async fn find_latest_by_ip(&self, ip: &str) -> RepositoryResult<Option<Visitor>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.ip_address == ip)
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
            .cloned())
    }

    async fn find_match(&self, identity: &VisitorIdentity) -> RepositoryResult<Option<Visitor>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|v| identity.matches(v))
            .max_by(|a, b| a.last_activity.cmp(&b.last_activity))
            .cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Visitor>> {
        Ok(self.rows.lock().unwrap().iter().find(|v| v.id.as_ref() == Some(id)).cloned())
    }

    async fn update(&self, visitor: &Visitor) -> RepositoryResult<()> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|v| v.id == visitor.id) {
            Some(row) => {
                *row = visitor.clone();
                Ok(())
            }
            None => Err(RepositoryError::not_found("Visitor not found")),
        }
    }

    async fn find_in_range(&self, range: &DateRange) -> RepositoryResult<Vec<Visitor>> {
        Ok(self.rows.lock().unwrap().iter().filter(|v| range.contains(&v.created_at)).cloned().collect())
    }

    async fn list_recent(&self, skip: u64, limit: i64) -> RepositoryResult<Vec<Visitor>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| b.id.cmp(&a.id)));
        Ok(rows.into_iter().skip(skip as usize).take(limit as usize).collect())
    }

    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub struct MemUsers {
    pub rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for MemUsers {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id.get_or_insert_with(ObjectId::new);
        self.rows.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }
}

#[derive(Default)]
pub struct MemCatalog {
    pub labels: Mutex<HashMap<ObjectId, String>>,
}

#[async_trait]
impl CatalogLookup for MemCatalog {
    async fn label(&self, _kind: CatalogKind, id: &ObjectId) -> RepositoryResult<Option<String>> {
        Ok(self.labels.lock().unwrap().get(id).cloned())
    }
}

/// Records every message handed to it; fails every send while `failing` is set.
#[derive(Default)]
pub struct ScriptedMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub attempts: Mutex<Vec<EmailMessage>>,
    pub failing: AtomicBool,
}

impl ScriptedMailer {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for ScriptedMailer {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.attempts.lock().unwrap().push(message.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::SmtpError("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub contacts: Arc<MemContacts>,
    pub visitors: Arc<MemVisitors>,
    pub users: Arc<MemUsers>,
    pub catalog: Arc<MemCatalog>,
    pub mailer: Arc<ScriptedMailer>,
    pub jwt: Arc<JwtTokenUtilsImpl>,
    pub admin: User,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::from_test_env())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let contacts = Arc::new(MemContacts::default());
        let visitors = Arc::new(MemVisitors::default());
        let users = Arc::new(MemUsers::default());
        let catalog = Arc::new(MemCatalog::default());
        let mailer = Arc::new(ScriptedMailer::default());
        let jwt = Arc::new(JwtTokenUtilsImpl::new(JwtConfig::default()));

        let admin = User {
            id: Some(ObjectId::new()),
            username: "admin".to_string(),
            first_name: "Dana".to_string(),
            last_name: "Fleet".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: PasswordUtilsImpl::hash_password(ADMIN_PASSWORD).unwrap(),
            role: ADMIN_ROLE.to_string(),
            created_at: None,
            updated_at: None,
        };
        users.rows.lock().unwrap().push(admin.clone());

        let notifier = Arc::new(NotificationService::new(
            mailer.clone(),
            config.site_name.clone(),
            Some(ADMIN_INBOX.to_string()),
        ));
        let services = AppServices {
            contact_service: Arc::new(ContactServiceImpl::new(
                contacts.clone(),
                catalog.clone(),
                users.clone(),
                notifier,
                "Test Bodies Team".to_string(),
            )),
            visitor_service: Arc::new(VisitorServiceImpl::new(visitors.clone())),
            user_service: Arc::new(UserServiceImpl::new(users.clone(), jwt.clone())),
            jwt_utils: jwt.clone(),
        };
        let router = build_router(&services, &config);

        TestApp { router, contacts, visitors, users, catalog, mailer, jwt, admin }
    }

    pub fn admin_token(&self) -> String {
        let id = self.admin.id.map(|id| id.to_hex()).unwrap_or_default();
        self.jwt.generate_token_pair(&id, &self.admin.email, ADMIN_ROLE).unwrap().access_token
    }

    pub async fn send(&self, req: Request<Body>) -> (u16, Value, Response<()>) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let (parts, body) = resp.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (parts.status.as_u16(), json, Response::from_parts(parts, ()))
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (u16, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, json, _) = self.send(req).await;
        (status, json)
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<&Value>) -> (u16, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.admin_token()));
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, json, _) = self.send(req).await;
        (status, json)
    }
}

pub fn enquiry(overrides: Value) -> Value {
    let mut base = serde_json::json!({
        "firstName": "A",
        "lastName": "B",
        "email": "a@b.com",
        "phone": "123",
        "enquiryType": "quote",
        "message": "hello"
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    base
}
