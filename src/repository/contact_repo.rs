use std::cmp::Ordering;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document, Regex};
use futures::stream::TryStreamExt;
use mongodb::{options::FindOptions, Collection, Database};
use tracing::{debug, error, info};

use crate::model::contact::{Contact, ContactStatus, EnquiryType, Priority};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Admin list filters. All present criteria must hold; `search` is a
/// case-insensitive substring match against any of [`SEARCH_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
    pub status: Option<ContactStatus>,
    pub enquiry_type: Option<EnquiryType>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

pub const SEARCH_FIELDS: [&str; 5] = ["firstName", "lastName", "email", "company", "message"];

impl ContactFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(enquiry_type) = self.enquiry_type {
            filter.insert("enquiryType", enquiry_type.as_str());
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority.as_str());
        }
        if let Some(search) = self.search_term() {
            let pattern = Regex { pattern: regex::escape(search), options: "i".to_string() };
            let any: Vec<Bson> = SEARCH_FIELDS
                .iter()
                .map(|field| {
                    let mut clause = Document::new();
                    clause.insert(*field, Bson::RegularExpression(pattern.clone()));
                    Bson::Document(clause)
                })
                .collect();
            filter.insert("$or", any);
        }
        filter
    }

    pub fn matches(&self, contact: &Contact) -> bool {
        if self.status.is_some_and(|s| s != contact.status)
            || self.enquiry_type.is_some_and(|t| t != contact.enquiry_type)
            || self.priority.is_some_and(|p| p != contact.priority)
        {
            return false;
        }
        let Some(search) = self.search_term() else { return true };
        let needle = search.to_lowercase();
        [
            Some(contact.first_name.as_str()),
            Some(contact.last_name.as_str()),
            Some(contact.email.as_str()),
            contact.company.as_deref(),
            Some(contact.message.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContactSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Priority,
    Status,
    FirstName,
    LastName,
    Email,
}

impl ContactSortField {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim() {
            "createdAt" => ContactSortField::CreatedAt,
            "updatedAt" => ContactSortField::UpdatedAt,
            "priority" => ContactSortField::Priority,
            "status" => ContactSortField::Status,
            "firstName" => ContactSortField::FirstName,
            "lastName" => ContactSortField::LastName,
            "email" => ContactSortField::Email,
            _ => return None,
        })
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            ContactSortField::CreatedAt => "createdAt",
            ContactSortField::UpdatedAt => "updatedAt",
            ContactSortField::Priority => "priority",
            ContactSortField::Status => "status",
            ContactSortField::FirstName => "firstName",
            ContactSortField::LastName => "lastName",
            ContactSortField::Email => "email",
        }
    }
}

/// Sort order for listings. Ties are broken by `_id` in the same direction
/// so paging is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSort {
    pub field: ContactSortField,
    pub descending: bool,
}

impl Default for ContactSort {
    fn default() -> Self {
        ContactSort { field: ContactSortField::CreatedAt, descending: true }
    }
}

impl ContactSort {
    pub fn to_document(&self) -> Document {
        let dir = if self.descending { -1 } else { 1 };
        let mut sort = Document::new();
        sort.insert(self.field.field_name(), dir);
        sort.insert("_id", dir);
        sort
    }

    /// Same ordering MongoDB applies for [`ContactSort::to_document`]: string
    /// fields compare by their stored representation.
    pub fn compare(&self, a: &Contact, b: &Contact) -> Ordering {
        let primary = match self.field {
            ContactSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            ContactSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            ContactSortField::Priority => a.priority.as_str().cmp(b.priority.as_str()),
            ContactSortField::Status => a.status.as_str().cmp(b.status.as_str()),
            ContactSortField::FirstName => a.first_name.cmp(&b.first_name),
            ContactSortField::LastName => a.last_name.cmp(&b.last_name),
            ContactSortField::Email => a.email.cmp(&b.email),
        };
        let ordering = primary.then_with(|| a.id.cmp(&b.id));
        if self.descending { ordering.reverse() } else { ordering }
    }
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert(&self, contact: Contact) -> RepositoryResult<Contact>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Contact>>;
    async fn list(&self, filter: &ContactFilter, sort: ContactSort, skip: u64, limit: i64) -> RepositoryResult<Vec<Contact>>;
    async fn count(&self, filter: &ContactFilter) -> RepositoryResult<u64>;
    /// Overwrite every stored field of an existing enquiry.
    async fn update(&self, contact: &Contact) -> RepositoryResult<()>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()>;
    /// `(enquiry type, count)` pairs, most frequent first.
    async fn count_by_enquiry_type(&self) -> RepositoryResult<Vec<(String, u64)>>;
}

pub struct MongoContactRepository {
    collection: Collection<Contact>,
}

impl MongoContactRepository {
    pub fn new(db: &Database, collection: &str) -> Self {
        MongoContactRepository { collection: db.collection::<Contact>(collection) }
    }
}

#[async_trait]
impl ContactRepository for MongoContactRepository {
    #[tracing::instrument(skip(self, contact), fields(email = %contact.email))]
    async fn insert(&self, mut contact: Contact) -> RepositoryResult<Contact> {
        contact.id = Some(ObjectId::new());
        self.collection.insert_one(&contact, None).await.map_err(|e| {
            error!("Failed to insert enquiry: {}", e);
            RepositoryError::from(e)
        })?;
        info!(id = ?contact.id, "Enquiry stored");
        Ok(contact)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Contact>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, filter: &ContactFilter, sort: ContactSort, skip: u64, limit: i64) -> RepositoryResult<Vec<Contact>> {
        let options = FindOptions::builder()
            .sort(sort.to_document())
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self.collection.find(filter.to_document(), options).await?;
        let contacts: Vec<Contact> = cursor.try_collect().await?;
        debug!("Fetched {} enquiries", contacts.len());
        Ok(contacts)
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self, filter: &ContactFilter) -> RepositoryResult<u64> {
        Ok(self.collection.count_documents(filter.to_document(), None).await?)
    }

    #[tracing::instrument(skip(self, contact), fields(id = ?contact.id))]
    async fn update(&self, contact: &Contact) -> RepositoryResult<()> {
        let id = contact
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot update an enquiry without an id"))?;
        let mut fields = bson::to_document(contact)?;
        fields.remove("_id");
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("Enquiry not found: {}", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<()> {
        let result = self.collection.delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Err(RepositoryError::not_found(format!("Enquiry not found: {}", id)));
        }
        info!("Enquiry deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn count_by_enquiry_type(&self) -> RepositoryResult<Vec<(String, u64)>> {
        let pipeline = vec![
            doc! { "$group": { "_id": "$enquiryType", "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1, "_id": 1 } },
        ];
        let mut cursor = self.collection.aggregate(pipeline, None).await?;
        let mut out = Vec::new();
        while let Some(row) = cursor.try_next().await? {
            let name = row.get_str("_id").unwrap_or_default().to_string();
            let count = match row.get("count") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                _ => 0,
            };
            out.push((name, count));
        }
        Ok(out)
    }
}
