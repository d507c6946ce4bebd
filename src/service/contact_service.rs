use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::dto::contact_dto::{
    ContactListResponse, ContactStatsResponse, ContactView, EnquiryTypeCount, ListContactsQuery, ReplyRequest,
    StatusOverview, SubmitContactRequest, UpdateContactRequest, REQUIRED_SUBMIT_FIELDS,
};
use crate::dto::pagination::{PageRequest, Pagination, DEFAULT_PAGE_SIZE};
use crate::model::catalog::{CatalogKind, CatalogRef, Relations};
use crate::model::contact::{
    Contact, ContactStatus, EnquiryType, Priority, ResponseMethod, Urgency, VehicleType, DEFAULT_SOURCE,
};
use crate::repository::catalog_repo::CatalogLookup;
use crate::repository::contact_repo::{ContactFilter, ContactRepository, ContactSort, ContactSortField};
use crate::repository::user_repo::UserRepository;
use crate::service::notification_service::NotificationService;
use crate::util::error::ServiceError;
use crate::util::request_meta::RequestMeta;
use crate::util::time::{now_iso, parse_iso, to_iso};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

const RECENT_COUNT: i64 = 5;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[async_trait]
pub trait ContactService: Send + Sync {
    /// Validate, store and acknowledge a public enquiry. Returns the new id.
    async fn submit(&self, request: SubmitContactRequest, meta: RequestMeta) -> Result<String, ServiceError>;
    async fn list(&self, query: ListContactsQuery) -> Result<ContactListResponse, ServiceError>;
    async fn get(&self, id: &str) -> Result<ContactView, ServiceError>;
    async fn update(&self, id: &str, patch: UpdateContactRequest) -> Result<ContactView, ServiceError>;
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
    async fn stats(&self) -> Result<ContactStatsResponse, ServiceError>;
    /// Mark the enquiry contacted, then email the reply. The status change is
    /// kept even when the email fails.
    async fn send_reply(
        &self,
        id: &str,
        request: ReplyRequest,
        sender_id: Option<&str>,
    ) -> Result<ContactView, ServiceError>;
}

pub struct ContactServiceImpl {
    contacts: Arc<dyn ContactRepository>,
    catalog: Arc<dyn CatalogLookup>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<NotificationService>,
    /// Signature used when the replying admin cannot be resolved
    default_sender: String,
}

impl ContactServiceImpl {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        catalog: Arc<dyn CatalogLookup>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<NotificationService>,
        default_sender: String,
    ) -> Self {
        Self { contacts, catalog, users, notifier, default_sender }
    }

    async fn populate(&self, contact: &Contact) -> Relations {
        Relations {
            service_category: self.resolve(CatalogKind::ServiceCategory, contact.service_category).await,
            specific_service: self.resolve(CatalogKind::Service, contact.specific_service).await,
            department: self.resolve(CatalogKind::Department, contact.department).await,
        }
    }

    async fn resolve(&self, kind: CatalogKind, id: Option<ObjectId>) -> Option<CatalogRef> {
        let id = id?;
        match self.catalog.label(kind, &id).await {
            Ok(label) => label.map(|label| CatalogRef::new(kind, &id, label)),
            Err(e) => {
                warn!("Failed to resolve {} {}: {}", kind.collection(), id, e);
                None
            }
        }
    }

    async fn view(&self, contact: Contact) -> ContactView {
        let relations = self.populate(&contact).await;
        ContactView::new(contact, relations)
    }

    async fn views(&self, contacts: Vec<Contact>) -> Vec<ContactView> {
        join_all(contacts.into_iter().map(|c| self.view(c))).await
    }

    async fn load(&self, id: &str) -> Result<Contact, ServiceError> {
        let oid = parse_id(id)?;
        self.contacts
            .find_by_id(&oid)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn sender_name(&self, sender_id: Option<&str>) -> String {
        let Some(oid) = sender_id.and_then(|id| ObjectId::parse_str(id).ok()) else {
            return self.default_sender.clone();
        };
        match self.users.find_by_id(&oid).await {
            Ok(Some(user)) => user.display_name(),
            Ok(None) => self.default_sender.clone(),
            Err(e) => {
                warn!("Failed to load reply sender {}: {}", oid, e);
                self.default_sender.clone()
            }
        }
    }
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Enquiry not found: {}", id))
}

/// A malformed id can never match a stored enquiry.
fn parse_id(id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(id.trim()).map_err(|_| not_found(id))
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_enum<T: std::str::FromStr<Err = String>>(value: Option<String>) -> Result<Option<T>, ServiceError> {
    clean(value)
        .map(|v| v.parse::<T>().map_err(ServiceError::InvalidInput))
        .transpose()
}

/// Weak reference from the public form; anything that is not an ObjectId is dropped.
fn weak_ref(value: Option<String>, field: &str) -> Option<ObjectId> {
    let raw = clean(value)?;
    match ObjectId::parse_str(&raw) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!("Ignoring invalid {} reference: {}", field, raw);
            None
        }
    }
}

/// Admin supplied reference: blank clears, malformed is rejected.
fn strict_ref(value: &str, field: &str) -> Result<Option<ObjectId>, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    ObjectId::parse_str(value)
        .map(Some)
        .map_err(|_| ServiceError::InvalidInput(format!("{} must be a valid id", field)))
}

fn normalize_email(raw: &str) -> Result<String, ServiceError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ServiceError::InvalidInput("Please provide a valid email address".to_string()));
    }
    Ok(email)
}

/// Turn a validated submission into a new enquiry. Priority is derived, never
/// taken from the request.
pub fn build_contact(request: SubmitContactRequest, meta: &RequestMeta, now: &str) -> Result<Contact, ServiceError> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(ServiceError::MissingFields {
            required: REQUIRED_SUBMIT_FIELDS.iter().map(|s| s.to_string()).collect(),
            missing,
        });
    }
    request
        .validate()
        .map_err(|e| ServiceError::InvalidInput(format!("Validation error: {}", e)))?;

    let email = normalize_email(request.email.as_deref().unwrap_or_default())?;
    let enquiry_type: EnquiryType = parse_enum(request.enquiry_type)?
        .ok_or_else(|| ServiceError::InvalidInput("enquiryType is required".to_string()))?;
    let vehicle_type: Option<VehicleType> = parse_enum(request.vehicle_type)?;
    let urgency: Option<Urgency> = parse_enum(request.urgency)?;

    let mut contact = Contact {
        id: None,
        first_name: clean(request.first_name).unwrap_or_default(),
        last_name: clean(request.last_name).unwrap_or_default(),
        email,
        phone: clean(request.phone).unwrap_or_default(),
        company: clean(request.company),
        job_title: clean(request.job_title),
        enquiry_type,
        service_category: weak_ref(request.service_category, "serviceCategory"),
        specific_service: weak_ref(request.specific_service, "specificService"),
        department: weak_ref(request.department, "department"),
        vehicle_type,
        vehicle_details: clean(request.vehicle_details),
        urgency,
        message: clean(request.message).unwrap_or_default(),
        status: ContactStatus::New,
        priority: Priority::Normal,
        notes: None,
        assigned_to: None,
        response_date: None,
        response_method: None,
        follow_up_date: None,
        source: DEFAULT_SOURCE.to_string(),
        utm_source: clean(request.utm_source),
        utm_medium: clean(request.utm_medium),
        utm_campaign: clean(request.utm_campaign),
        ip_address: Some(meta.ip.clone()),
        user_agent: meta.user_agent.clone(),
        referrer: meta.referrer.clone(),
        page_url: meta.page_url.clone(),
        marketing_consent: request.marketing_consent.unwrap_or(false),
        privacy_consent: request.privacy_consent.unwrap_or(true),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };
    contact.refresh_priority();
    Ok(contact)
}

/// Apply an admin patch. When the patch carries urgency, priority is
/// recomputed after every other field is set.
pub fn apply_patch(contact: &mut Contact, patch: UpdateContactRequest, now: &str) -> Result<(), ServiceError> {
    if patch.is_empty() {
        return Err(ServiceError::InvalidInput("No fields to update".to_string()));
    }
    patch
        .validate()
        .map_err(|e| ServiceError::InvalidInput(format!("Validation error: {}", e)))?;

    if let Some(v) = patch.first_name {
        contact.first_name = v.trim().to_string();
    }
    if let Some(v) = patch.last_name {
        contact.last_name = v.trim().to_string();
    }
    if let Some(v) = patch.email {
        contact.email = normalize_email(&v)?;
    }
    if let Some(v) = patch.phone {
        contact.phone = v.trim().to_string();
    }
    if patch.company.is_some() {
        contact.company = clean(patch.company);
    }
    if patch.job_title.is_some() {
        contact.job_title = clean(patch.job_title);
    }
    if let Some(v) = patch.enquiry_type {
        contact.enquiry_type = v;
    }
    if let Some(v) = patch.service_category {
        contact.service_category = strict_ref(&v, "serviceCategory")?;
    }
    if let Some(v) = patch.specific_service {
        contact.specific_service = strict_ref(&v, "specificService")?;
    }
    if let Some(v) = patch.department {
        contact.department = strict_ref(&v, "department")?;
    }
    if let Some(v) = patch.vehicle_type {
        contact.vehicle_type = Some(v);
    }
    if patch.vehicle_details.is_some() {
        contact.vehicle_details = clean(patch.vehicle_details);
    }
    if let Some(v) = patch.message {
        contact.message = v.trim().to_string();
    }
    if let Some(v) = patch.status {
        contact.status = v;
    }
    if let Some(v) = patch.priority {
        contact.priority = v;
    }
    if patch.notes.is_some() {
        contact.notes = clean(patch.notes);
    }
    if let Some(v) = patch.assigned_to {
        contact.assigned_to = strict_ref(&v, "assignedTo")?;
    }
    if let Some(v) = patch.response_method {
        contact.response_method = Some(v);
    }
    if let Some(v) = patch.follow_up_date {
        contact.follow_up_date = match v.trim() {
            "" => None,
            raw => Some(
                parse_iso(raw)
                    .map(to_iso)
                    .ok_or_else(|| ServiceError::InvalidInput("followUpDate must be a valid date".to_string()))?,
            ),
        };
    }
    if let Some(v) = patch.marketing_consent {
        contact.marketing_consent = v;
    }
    if let Some(v) = patch.urgency {
        contact.urgency = Some(v);
        contact.refresh_priority();
    }
    contact.updated_at = now.to_string();
    Ok(())
}

/// Parse the raw list query into filter, sort and page.
pub fn parse_list_query(query: ListContactsQuery) -> Result<(ContactFilter, ContactSort, PageRequest), ServiceError> {
    let filter = ContactFilter {
        status: parse_enum(query.status)?,
        enquiry_type: parse_enum(query.enquiry_type)?,
        priority: parse_enum(query.priority)?,
        search: clean(query.search),
    };

    let field = match clean(query.sort_by) {
        None => ContactSortField::default(),
        Some(raw) => ContactSortField::parse(&raw)
            .ok_or_else(|| ServiceError::InvalidInput(format!("Cannot sort by '{}'", raw)))?,
    };
    let descending = match clean(query.sort_order).map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("desc") => true,
        Some("asc") => false,
        Some(other) => {
            return Err(ServiceError::InvalidInput(format!(
                "sortOrder must be 'asc' or 'desc', got '{}'",
                other
            )))
        }
    };

    let page = PageRequest::parse(query.page.as_deref(), query.limit.as_deref(), DEFAULT_PAGE_SIZE)
        .map_err(ServiceError::InvalidInput)?;
    Ok((filter, ContactSort { field, descending }, page))
}

#[async_trait]
impl ContactService for ContactServiceImpl {
    #[instrument(skip_all, fields(ip = %meta.ip))]
    async fn submit(&self, request: SubmitContactRequest, meta: RequestMeta) -> Result<String, ServiceError> {
        let contact = build_contact(request, &meta, &now_iso())?;
        let stored = self.contacts.insert(contact).await.map_err(|e| {
            error!("Failed to store enquiry: {}", e);
            ServiceError::InternalError(e.to_string())
        })?;
        let id = stored.id.map(|id| id.to_hex()).unwrap_or_default();
        info!(contact_id = %id, priority = %stored.priority, "Enquiry received");

        // Re-read so the emails reflect exactly what was stored.
        let stored = match stored.id {
            Some(oid) => match self.contacts.find_by_id(&oid).await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => stored,
                Err(e) => {
                    warn!("Failed to re-read enquiry {}: {}", id, e);
                    stored
                }
            },
            None => stored,
        };
        let relations = self.populate(&stored).await;
        let delivery = self.notifier.notify_new_enquiry(&stored, &relations).await;
        debug!(
            admin_notified = delivery.admin.is_ok(),
            customer_acknowledged = delivery.customer.is_ok(),
            "Enquiry emails dispatched"
        );

        Ok(id)
    }

    #[instrument(skip_all)]
    async fn list(&self, query: ListContactsQuery) -> Result<ContactListResponse, ServiceError> {
        let (filter, sort, page) = parse_list_query(query)?;
        let total = self.contacts.count(&filter).await?;
        let contacts = self
            .contacts
            .list(&filter, sort, page.skip(), page.limit as i64)
            .await?;
        debug!("Listing {} of {} enquiries", contacts.len(), total);

        Ok(ContactListResponse {
            success: true,
            contacts: self.views(contacts).await,
            pagination: Pagination::new(page.page, page.limit, total),
        })
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<ContactView, ServiceError> {
        let contact = self.load(id).await?;
        Ok(self.view(contact).await)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: UpdateContactRequest) -> Result<ContactView, ServiceError> {
        let mut contact = self.load(id).await?;
        apply_patch(&mut contact, patch, &now_iso())?;
        self.contacts.update(&contact).await?;
        info!(status = %contact.status, priority = %contact.priority, "Enquiry updated");
        Ok(self.view(contact).await)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let oid = parse_id(id)?;
        self.contacts.delete(&oid).await.map_err(|e| match ServiceError::from(e) {
            ServiceError::NotFound(_) => not_found(id),
            other => other,
        })
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<ContactStatsResponse, ServiceError> {
        let by_status = |status| ContactFilter { status: Some(status), ..ContactFilter::default() };
        let overall = StatusOverview {
            total: self.contacts.count(&ContactFilter::default()).await?,
            new: self.contacts.count(&by_status(ContactStatus::New)).await?,
            in_progress: self.contacts.count(&by_status(ContactStatus::InProgress)).await?,
            contacted: self.contacts.count(&by_status(ContactStatus::Contacted)).await?,
            urgent: self
                .contacts
                .count(&ContactFilter { priority: Some(Priority::Urgent), ..ContactFilter::default() })
                .await?,
        };
        let enquiry_types = self
            .contacts
            .count_by_enquiry_type()
            .await?
            .into_iter()
            .map(|(enquiry_type, count)| EnquiryTypeCount { enquiry_type, count })
            .collect();
        let recent = self
            .contacts
            .list(&ContactFilter::default(), ContactSort::default(), 0, RECENT_COUNT)
            .await?;

        Ok(ContactStatsResponse {
            success: true,
            overall,
            enquiry_types,
            recent: self.views(recent).await,
        })
    }

    #[instrument(skip(self, request))]
    async fn send_reply(
        &self,
        id: &str,
        request: ReplyRequest,
        sender_id: Option<&str>,
    ) -> Result<ContactView, ServiceError> {
        let (Some(subject), Some(message)) = (clean(request.subject), clean(request.message)) else {
            return Err(ServiceError::InvalidInput("Subject and message are required".to_string()));
        };

        let mut contact = self.load(id).await?;
        let now = now_iso();
        contact.status = ContactStatus::Contacted;
        contact.response_date = Some(now.clone());
        contact.response_method = Some(request.response_method.unwrap_or(ResponseMethod::Email));
        contact.updated_at = now;
        self.contacts.update(&contact).await?;
        info!("Enquiry marked contacted");

        let sender_name = self.sender_name(sender_id).await;
        let relations = self.populate(&contact).await;
        if let Err(e) = self
            .notifier
            .send_reply(&contact, &relations, &subject, &message, &sender_name)
            .await
        {
            error!("Reply email failed after status update: {}", e);
            return Err(ServiceError::Delivery(format!("Reply saved but email could not be sent: {}", e)));
        }

        Ok(ContactView::new(contact, relations))
    }
}
