use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::stream::TryStreamExt;
use mongodb::{
    options::{FindOneOptions, FindOptions},
    Collection, Database,
};
use tracing::{debug, info};

use crate::model::visitor::Visitor;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::util::analytics::DateRange;

/// Lookup keys for the identity heuristic: a stored record is the same
/// visitor when its IP, session id or (if given) email matches.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitorIdentity {
    pub ip_address: String,
    pub session_id: Option<String>,
    pub email: Option<String>,
}

impl VisitorIdentity {
    pub fn to_document(&self) -> Document {
        let mut any = vec![Bson::Document(doc! { "ipAddress": &self.ip_address })];
        if let Some(session_id) = &self.session_id {
            any.push(Bson::Document(doc! { "sessionId": session_id }));
        }
        if let Some(email) = &self.email {
            any.push(Bson::Document(doc! { "email": email }));
        }
        doc! { "$or": any }
    }

    pub fn matches(&self, visitor: &Visitor) -> bool {
        visitor.ip_address == self.ip_address
            || (self.session_id.is_some() && visitor.session_id == self.session_id)
            || (self.email.is_some() && visitor.email == self.email)
    }
}

#[async_trait]
pub trait VisitorRepository: Send + Sync {
    async fn insert(&self, visitor: Visitor) -> RepositoryResult<Visitor>;
    /// Newest record (by creation time) seen from `ip`
    async fn find_latest_by_ip(&self, ip: &str) -> RepositoryResult<Option<Visitor>>;
    /// Most recently active record matching `identity`
    async fn find_match(&self, identity: &VisitorIdentity) -> RepositoryResult<Option<Visitor>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Visitor>>;
    async fn update(&self, visitor: &Visitor) -> RepositoryResult<()>;
    /// Every record created inside `range`
    async fn find_in_range(&self, range: &DateRange) -> RepositoryResult<Vec<Visitor>>;
    /// Page of records ordered by last seen, newest first
    async fn list_recent(&self, skip: u64, limit: i64) -> RepositoryResult<Vec<Visitor>>;
    async fn count(&self) -> RepositoryResult<u64>;
}

pub struct MongoVisitorRepository {
    collection: Collection<Visitor>,
}

impl MongoVisitorRepository {
    pub fn new(db: &Database, collection: &str) -> Self {
        MongoVisitorRepository { collection: db.collection::<Visitor>(collection) }
    }
}

#[async_trait]
impl VisitorRepository for MongoVisitorRepository {
    #[tracing::instrument(skip(self, visitor), fields(ip = %visitor.ip_address))]
    async fn insert(&self, mut visitor: Visitor) -> RepositoryResult<Visitor> {
        visitor.id = Some(ObjectId::new());
        self.collection.insert_one(&visitor, None).await?;
        debug!(id = ?visitor.id, "Visitor stored");
        Ok(visitor)
    }

    #[tracing::instrument(skip(self))]
    async fn find_latest_by_ip(&self, ip: &str) -> RepositoryResult<Option<Visitor>> {
        let options = FindOneOptions::builder().sort(doc! { "createdAt": -1 }).build();
        Ok(self.collection.find_one(doc! { "ipAddress": ip }, options).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_match(&self, identity: &VisitorIdentity) -> RepositoryResult<Option<Visitor>> {
        let options = FindOneOptions::builder().sort(doc! { "lastSeen": -1 }).build();
        Ok(self.collection.find_one(identity.to_document(), options).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Visitor>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }

    #[tracing::instrument(skip(self, visitor), fields(id = ?visitor.id))]
    async fn update(&self, visitor: &Visitor) -> RepositoryResult<()> {
        let id = visitor
            .id
            .ok_or_else(|| RepositoryError::validation("Cannot update a visitor without an id"))?;
        let mut fields = bson::to_document(visitor)?;
        fields.remove("_id");
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("Visitor not found: {}", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(start = %range.start_iso(), end = %range.end_iso()))]
    async fn find_in_range(&self, range: &DateRange) -> RepositoryResult<Vec<Visitor>> {
        let filter = doc! { "createdAt": { "$gte": range.start_iso(), "$lte": range.end_iso() } };
        let cursor = self.collection.find(filter, None).await?;
        let visitors: Vec<Visitor> = cursor.try_collect().await?;
        info!("Loaded {} visitor records for analytics", visitors.len());
        Ok(visitors)
    }

    #[tracing::instrument(skip(self))]
    async fn list_recent(&self, skip: u64, limit: i64) -> RepositoryResult<Vec<Visitor>> {
        let options = FindOptions::builder()
            .sort(doc! { "lastSeen": -1, "_id": -1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self.collection.find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self) -> RepositoryResult<u64> {
        Ok(self.collection.count_documents(None, None).await?)
    }
}
