//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc, oid::ObjectId},
    options::{IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::UserResult;
use crate::models::{NewUser, UpdateUser, User};
use crate::repository::UserRepository;

const COLLECTION_NAME: &str = "users";
const EMAIL_INDEX_NAME: &str = "idx_email_unique";

/// Stored shape of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    age: i32,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn to_chrono(value: bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis()).unwrap_or_default()
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.name,
            email: doc.email,
            age: doc.age,
            created_at: to_chrono(doc.created_at),
            updated_at: to_chrono(doc.updated_at),
        }
    }
}

/// MongoDB implementation of the UserRepository
pub struct MongoUserRepository {
    collection: Collection<UserDocument>,
}

impl MongoUserRepository {
    /// Create a new MongoUserRepository on the `users` collection
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
    /// let repo = MongoUserRepository::new(client.database("users"));
    /// repo.init_indexes().await?;
    /// ```
    pub fn new(db: Database) -> Self {
        Self {
            collection: db.collection::<UserDocument>(COLLECTION_NAME),
        }
    }

    /// Create the unique email index. Idempotent; safe to call on every startup.
    #[instrument(skip(self))]
    pub async fn init_indexes(&self) -> UserResult<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(EMAIL_INDEX_NAME.to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(email_index).await?;

        tracing::info!(index = EMAIL_INDEX_NAME, "User indexes initialized");
        Ok(())
    }

    /// `$set` document holding only the provided fields plus a fresh `updated_at`
    fn build_update(update: &UpdateUser, now: bson::DateTime) -> Document {
        let mut set = doc! { "updated_at": now };

        if let Some(ref name) = update.name {
            set.insert("name", name.as_str());
        }
        if let Some(ref email) = update.email {
            set.insert("email", email.as_str());
        }
        if let Some(age) = update.age {
            set.insert("age", age);
        }

        doc! { "$set": set }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: ObjectId) -> UserResult<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(user.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> UserResult<Vec<User>> {
        use futures_util::TryStreamExt;

        let cursor = self.collection.find(doc! {}).await?;
        let users: Vec<UserDocument> = cursor.try_collect().await?;

        Ok(users.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self, user))]
    async fn insert(&self, user: NewUser) -> UserResult<User> {
        let now = bson::DateTime::now();
        let document = UserDocument {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: now,
            updated_at: now,
        };

        self.collection.insert_one(&document).await?;

        tracing::info!(user_id = %document.id, "User created");
        Ok(document.into())
    }

    #[instrument(skip(self, update))]
    async fn find_by_id_and_update(
        &self,
        id: ObjectId,
        update: UpdateUser,
    ) -> UserResult<Option<User>> {
        let changes = Self::build_update(&update, bson::DateTime::now());

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": id }, changes)
            .return_document(ReturnDocument::After)
            .await?;

        if updated.is_some() {
            tracing::info!(user_id = %id, "User updated");
        }
        Ok(updated.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id_and_delete(&self, id: ObjectId) -> UserResult<Option<User>> {
        let removed = self
            .collection
            .find_one_and_delete(doc! { "_id": id })
            .await?;

        if removed.is_some() {
            tracing::info!(user_id = %id, "User deleted");
        }
        Ok(removed.map(User::from))
    }
}
