use crate::config::mongo_conf::MongoConfig;
use crate::model::user::{normalize_email, User, UserProfile};
use crate::repository::quote_repo::create_unique_index;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::Utc;
use mongodb::{Client, Collection};
use tracing::{info, warn};

pub const EMAIL_FIELD: &str = "email";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn update(&self, id: ObjectId, user: User) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;

    /// Finds the user owning `email`, creating one from `profile` when none
    /// exists. A concurrent insert of the same email resolves to the winner.
    async fn resolve_by_email(&self, email: &str, profile: &UserProfile) -> RepositoryResult<User> {
        let email = normalize_email(email);
        if let Some(user) = self.find_by_email(&email).await? {
            return Ok(user);
        }
        match self.insert(User::new(&email, profile)).await {
            Ok(user) => {
                info!(email = %email, "Created user");
                Ok(user)
            }
            Err(e) if e.is_duplicate_on(EMAIL_FIELD) => {
                warn!(email = %email, "User created concurrently, reusing it");
                self.find_by_email(&email)
                    .await?
                    .ok_or_else(|| RepositoryError::not_found(format!("User vanished after duplicate insert: {}", email)))
            }
            Err(e) => Err(e),
        }
    }
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(client: &Client, config: &MongoConfig) -> Self {
        let db = client.database(&config.database);
        MongoUserRepository { collection: db.collection("users") }
    }

    pub async fn ensure_indexes(&self) -> RepositoryResult<()> {
        create_unique_index(&self.collection, EMAIL_FIELD).await
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        user.id = Some(ObjectId::new());
        let now = Utc::now();
        user.created_at = Some(now);
        user.updated_at = Some(now);
        self.collection.insert_one(&user, None).await?;
        Ok(user)
    }

    async fn update(&self, id: ObjectId, mut user: User) -> RepositoryResult<User> {
        user.id = Some(id);
        user.updated_at = Some(Utc::now());
        let result = self.collection.replace_one(doc! { "_id": id }, &user, None).await?;
        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No user found to update for ID: {}", id)));
        }
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let filter = doc! { EMAIL_FIELD: normalize_email(email) };
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by email: {}", e)))
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by id: {}", e)))
    }
}
