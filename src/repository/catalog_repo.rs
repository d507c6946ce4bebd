use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::{options::FindOneOptions, Database};
use tracing::debug;

use crate::model::catalog::CatalogKind;
use crate::repository::repository_error::RepositoryResult;

/// Read-only access to the service and department collections that enquiries
/// reference by id.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Human readable label for `id`, `None` when the record no longer exists.
    async fn label(&self, kind: CatalogKind, id: &ObjectId) -> RepositoryResult<Option<String>>;
}

pub struct MongoCatalogLookup {
    db: Database,
}

impl MongoCatalogLookup {
    pub fn new(db: &Database) -> Self {
        MongoCatalogLookup { db: db.clone() }
    }
}

#[async_trait]
impl CatalogLookup for MongoCatalogLookup {
    #[tracing::instrument(skip(self))]
    async fn label(&self, kind: CatalogKind, id: &ObjectId) -> RepositoryResult<Option<String>> {
        let field = kind.label_field();
        let mut projection = Document::new();
        projection.insert(field, 1);
        let options = FindOneOptions::builder().projection(projection).build();

        let found = self
            .db
            .collection::<Document>(kind.collection())
            .find_one(doc! { "_id": id }, options)
            .await?;
        if found.is_none() {
            debug!("Dangling {} reference {}", kind.collection(), id);
        }
        Ok(found.and_then(|d| d.get_str(field).ok().map(str::to_string)))
    }
}
