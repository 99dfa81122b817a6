use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{NewUser, UpdateUser, User};

/// Repository trait for User persistence
///
/// Every operation may fail with [`UserError::DuplicateKey`] when the store's
/// unique email index rejects a write; other failures surface as
/// [`UserError::Database`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by exact email
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    async fn find_by_id(&self, id: ObjectId) -> UserResult<Option<User>>;

    /// All users in store order
    async fn find_all(&self) -> UserResult<Vec<User>>;

    /// Store a new user, assigning its id and timestamps
    async fn insert(&self, user: NewUser) -> UserResult<User>;

    /// Apply the provided fields and return the document after the update,
    /// or `None` if no user has this id
    async fn find_by_id_and_update(
        &self,
        id: ObjectId,
        update: UpdateUser,
    ) -> UserResult<Option<User>>;

    /// Remove a user and return the removed document
    async fn find_by_id_and_delete(&self, id: ObjectId) -> UserResult<Option<User>>;
}

/// In-memory implementation of UserRepository (for testing/development)
///
/// Keeps insertion order and enforces email uniqueness the way the MongoDB
/// unique index does.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: ObjectId) -> UserResult<Option<User>> {
        let id = id.to_hex();
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: NewUser) -> UserResult<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.email == user.email) {
            return Err(UserError::DuplicateKey(format!(
                "duplicate key: {{ email: \"{}\" }}",
                user.email
            )));
        }

        let now = Utc::now();
        let created = User {
            id: ObjectId::new().to_hex(),
            name: user.name,
            email: user.email,
            age: user.age,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());

        tracing::info!(user_id = %created.id, "Created user");
        Ok(created)
    }

    async fn find_by_id_and_update(
        &self,
        id: ObjectId,
        update: UpdateUser,
    ) -> UserResult<Option<User>> {
        let id = id.to_hex();
        let mut users = self.users.write().await;

        if let Some(ref email) = update.email
            && users.iter().any(|u| u.id != id && &u.email == email)
        {
            return Err(UserError::DuplicateKey(format!(
                "duplicate key: {{ email: \"{}\" }}",
                email
            )));
        }

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(age) = update.age {
            user.age = age;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn find_by_id_and_delete(&self, id: ObjectId) -> UserResult<Option<User>> {
        let id = id.to_hex();
        let mut users = self.users.write().await;

        let removed = users
            .iter()
            .position(|u| u.id == id)
            .map(|index| users.remove(index));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryUserRepository::new();

        let created = repo
            .insert(new_user("Test User", "test@example.com"))
            .await
            .unwrap();
        assert_eq!(created.email, "test@example.com");
        assert_eq!(created.created_at, created.updated_at);

        let id = ObjectId::parse_str(&created.id).unwrap();
        let fetched = repo.find_by_id(id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_find_by_email_is_exact() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("Test User", "test@example.com"))
            .await
            .unwrap();

        assert!(repo.find_by_email("test@example.com").await.unwrap().is_some());
        assert!(repo.find_by_email("TEST@EXAMPLE.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_error() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("User One", "test@example.com"))
            .await
            .unwrap();

        let result = repo.insert(new_user("User Two", "test@example.com")).await;
        assert!(matches!(result, Err(UserError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_find_all_keeps_insertion_order() {
        let repo = InMemoryUserRepository::new();
        for (name, email) in [("Alice", "a@example.com"), ("Bob", "b@example.com")] {
            repo.insert(new_user(name, email)).await.unwrap();
        }

        let names: Vec<_> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_update_applies_only_provided_fields() {
        let repo = InMemoryUserRepository::new();
        let created = repo.insert(new_user("Alice", "a@example.com")).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        let update = UpdateUser {
            age: Some(31),
            ..Default::default()
        };
        let updated = repo.find_by_id_and_update(id, update).await.unwrap().unwrap();

        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.age, 31);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_none() {
        let repo = InMemoryUserRepository::new();
        let result = repo
            .find_by_id_and_update(ObjectId::new(), UpdateUser::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_to_taken_email_is_duplicate_key() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("Alice", "a@example.com")).await.unwrap();
        let bob = repo.insert(new_user("Bob", "b@example.com")).await.unwrap();

        let update = UpdateUser {
            email: Some("a@example.com".to_string()),
            ..Default::default()
        };
        let result = repo
            .find_by_id_and_update(ObjectId::parse_str(&bob.id).unwrap(), update)
            .await;
        assert!(matches!(result, Err(UserError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_once() {
        let repo = InMemoryUserRepository::new();
        let created = repo.insert(new_user("Alice", "a@example.com")).await.unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        assert_eq!(repo.find_by_id_and_delete(id).await.unwrap(), Some(created));
        assert_eq!(repo.find_by_id_and_delete(id).await.unwrap(), None);
    }
}
