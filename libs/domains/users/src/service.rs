//! User Service - Business logic layer

use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, NewUser, UpdateUser, User};
use crate::repository::UserRepository;

/// User service providing business logic operations
///
/// Enforces email uniqueness and id well-formedness before delegating to the
/// repository. The read-before-write email check is not atomic; the store's
/// unique index catches the race and its duplicate-key error is reported as the
/// same conflict.
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

/// Syntactic id check; never touches the store.
fn parse_id(id: &str) -> UserResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| UserError::InvalidId(id.to_string()))
}

/// Report a unique-index violation as a conflict on `email`.
fn conflict_on(email: &str) -> impl FnOnce(UserError) -> UserError + '_ {
    move |err| match err {
        UserError::DuplicateKey(detail) => {
            tracing::warn!(%detail, "Unique index rejected concurrent write");
            UserError::EmailConflict(email.to_string())
        }
        other => other,
    }
}

impl<R: UserRepository> UserService<R> {
    /// Create a new UserService with the given repository
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a new user; fails with a conflict if the email is taken
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        let new_user = NewUser::try_from(input)?;

        if self
            .repository
            .find_by_email(&new_user.email)
            .await?
            .is_some()
        {
            return Err(UserError::EmailConflict(new_user.email));
        }

        let email = new_user.email.clone();
        self.repository
            .insert(new_user)
            .await
            .map_err(conflict_on(&email))
    }

    /// All users, unfiltered, in store order
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repository.find_all().await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> UserResult<User> {
        let object_id = parse_id(id)?;

        self.repository
            .find_by_id(object_id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    /// Apply a partial update and return the user as stored afterwards
    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: &str, input: UpdateUser) -> UserResult<User> {
        let object_id = parse_id(id)?;
        input.validate()?;

        let email = input.email.clone();

        // Moving to another user's email is a conflict; keeping one's own is fine.
        if let Some(ref email) = email
            && let Some(existing) = self.repository.find_by_email(email).await?
            && existing.id != object_id.to_hex()
        {
            return Err(UserError::EmailConflict(email.clone()));
        }

        let updated = self
            .repository
            .find_by_id_and_update(object_id, input)
            .await;

        let updated = match email {
            Some(ref email) => updated.map_err(conflict_on(email))?,
            None => updated?,
        };

        updated.ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    /// Delete a user and return the removed record
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> UserResult<User> {
        let object_id = parse_id(id)?;

        self.repository
            .find_by_id_and_delete(object_id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryUserRepository, MockUserRepository};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn create_input(name: &str, email: &str, age: i32) -> CreateUser {
        CreateUser {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            age: Some(age),
            ..Default::default()
        }
    }

    fn stored_user(id: ObjectId, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_hex(),
            name: "Stored User".to_string(),
            email: email.to_string(),
            age: 40,
            created_at: now,
            updated_at: now,
        }
    }

    fn service() -> UserService<InMemoryUserRepository> {
        UserService::new(InMemoryUserRepository::new())
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let service = service();

        let created = service
            .create_user(create_input("John Doe", "john.doe@example.com", 30))
            .await
            .unwrap();
        let fetched = service.get_user(&created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "John Doe");
        assert_eq!(fetched.email, "john.doe@example.com");
        assert_eq!(fetched.age, 30);
    }

    #[tokio::test]
    async fn test_create_duplicate_email_conflicts() {
        let service = service();
        service
            .create_user(create_input("Jane Doe", "jane@example.com", 25))
            .await
            .unwrap();

        let result = service
            .create_user(create_input("Jane Again", "jane@example.com", 26))
            .await;

        assert!(matches!(result, Err(UserError::EmailConflict(ref e)) if e == "jane@example.com"));
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_invalid_payload_never_hits_store() {
        // No expectations: any repository call panics.
        let service = UserService::new(MockUserRepository::new());

        let result = service
            .create_user(create_input("Jo", "nope", 200))
            .await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_race_duplicate_key_becomes_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(UserError::DuplicateKey("E11000 duplicate key".into())));

        let service = UserService::new(repo);
        let result = service
            .create_user(create_input("Racer", "race@example.com", 33))
            .await;

        assert!(matches!(result, Err(UserError::EmailConflict(ref e)) if e == "race@example.com"));
    }

    #[tokio::test]
    async fn test_create_database_failure_propagates() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Err(UserError::Database("server selection timeout".into())));

        let service = UserService::new(repo);
        let result = service
            .create_user(create_input("John Doe", "john@example.com", 30))
            .await;

        assert!(matches!(result, Err(UserError::Database(_))));
    }

    #[tokio::test]
    async fn test_invalid_id_never_hits_store() {
        let service = UserService::new(MockUserRepository::new());

        for id in ["abc", "", "507f1f77bcf86cd79943901z", "507f1f77bcf86cd7994390111"] {
            assert!(matches!(
                service.get_user(id).await,
                Err(UserError::InvalidId(ref got)) if got == id
            ));
            assert!(matches!(
                service.delete_user(id).await,
                Err(UserError::InvalidId(_))
            ));
            assert!(matches!(
                service.update_user(id, UpdateUser::default()).await,
                Err(UserError::InvalidId(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_get_unknown_id_not_found() {
        let service = service();
        let id = ObjectId::new().to_hex();

        let result = service.get_user(&id).await;
        assert!(matches!(result, Err(UserError::NotFound(ref got)) if *got == id));
    }

    #[tokio::test]
    async fn test_update_to_other_users_email_conflicts() {
        let service = service();
        service
            .create_user(create_input("Alice", "alice@example.com", 30))
            .await
            .unwrap();
        let bob = service
            .create_user(create_input("Bobby", "bob@example.com", 31))
            .await
            .unwrap();

        let update = UpdateUser {
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        let result = service.update_user(&bob.id, update).await;

        assert!(matches!(result, Err(UserError::EmailConflict(_))));
        assert_eq!(service.get_user(&bob.id).await.unwrap().email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_update_to_own_email_succeeds() {
        let service = service();
        let alice = service
            .create_user(create_input("Alice", "alice@example.com", 30))
            .await
            .unwrap();

        let update = UpdateUser {
            name: Some("Alice Cooper".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        let updated = service.update_user(&alice.id, update).await.unwrap();

        assert_eq!(updated.name, "Alice Cooper");
        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(updated.age, 30);
        assert_eq!(updated.created_at, alice.created_at);
    }

    #[tokio::test]
    async fn test_update_without_email_skips_lookup() {
        let id = ObjectId::new();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().never();
        repo.expect_find_by_id_and_update()
            .with(eq(id), mockall::predicate::always())
            .times(1)
            .returning(move |id, _| Ok(Some(stored_user(id, "kept@example.com"))));

        let service = UserService::new(repo);
        let update = UpdateUser {
            age: Some(41),
            ..Default::default()
        };
        let updated = service.update_user(&id.to_hex(), update).await.unwrap();

        assert_eq!(updated.id, id.to_hex());
    }

    #[tokio::test]
    async fn test_update_invalid_payload_rejected() {
        let service = UserService::new(MockUserRepository::new());
        let update = UpdateUser {
            name: Some("Al".to_string()),
            ..Default::default()
        };

        let result = service.update_user(&ObjectId::new().to_hex(), update).await;
        assert!(matches!(result, Err(UserError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_unknown_id_not_found() {
        let service = service();
        let update = UpdateUser {
            age: Some(50),
            ..Default::default()
        };

        let result = service.update_user(&ObjectId::new().to_hex(), update).await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_race_duplicate_key_becomes_conflict() {
        let id = ObjectId::new();
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_find_by_id_and_update()
            .returning(|_, _| Err(UserError::DuplicateKey("E11000".into())));

        let service = UserService::new(repo);
        let update = UpdateUser {
            email: Some("taken@example.com".to_string()),
            ..Default::default()
        };
        let result = service.update_user(&id.to_hex(), update).await;

        assert!(matches!(result, Err(UserError::EmailConflict(ref e)) if e == "taken@example.com"));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let service = service();
        let created = service
            .create_user(create_input("John Doe", "john.doe@example.com", 30))
            .await
            .unwrap();

        let removed = service.delete_user(&created.id).await.unwrap();
        assert_eq!(removed.id, created.id);

        let again = service.delete_user(&created.id).await;
        assert!(matches!(again, Err(UserError::NotFound(_))));
        assert!(matches!(
            service.get_user(&created.id).await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_users_returns_all() {
        let service = service();
        assert!(service.list_users().await.unwrap().is_empty());

        for (name, email) in [("Alice", "a@example.com"), ("Bobby", "b@example.com")] {
            service
                .create_user(create_input(name, email, 20))
                .await
                .unwrap();
        }

        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }
}
