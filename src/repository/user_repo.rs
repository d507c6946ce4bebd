use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use mongodb::{Collection, Database};
use tracing::info;

use crate::model::user::User;
use crate::repository::repository_error::RepositoryResult;
use crate::util::time::now_iso;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database, collection: &str) -> Self {
        MongoUserRepository { collection: db.collection::<User>(collection) }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[tracing::instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id = Some(ObjectId::new());
        let now = now_iso();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        self.collection.insert_one(&user, None).await?;
        info!("User created");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }, None).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }, None).await?)
    }
}
