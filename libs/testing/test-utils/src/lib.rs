//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `mongo` (default): Enables MongoDB test infrastructure
//! - `all`: Enables all database test infrastructure
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_mongo_test");
//!
//!     let db = mongo.database(&builder.database_name());
//!     let email = builder.email("primary");
//! }
//! ```

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data, while distinct
/// tests sharing one database never collide on unique fields.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_user");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Display name of 3-50 characters.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let name = TestDataBuilder::new(7).name("alice");
    /// assert_eq!(name, "alice 7");
    /// ```
    pub fn name(&self, suffix: &str) -> String {
        let mut name = format!("{} {}", suffix, self.seed % 10_000);
        name.truncate(50);
        name
    }

    /// Email unique to this builder and suffix.
    pub fn email(&self, suffix: &str) -> String {
        format!("{}.{}@example.com", suffix, self.seed)
    }

    /// Age within 0..=120.
    pub fn age(&self) -> i32 {
        // Bounded by the modulus, so the cast cannot truncate.
        (self.seed % 121) as i32
    }

    /// Database name unique to this builder.
    pub fn database_name(&self) -> String {
        format!("test_{}", self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a string is a 24 character lowercase hex identifier
    pub fn assert_object_id(id: &str, context: &str) {
        assert!(
            id.len() == 24 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')),
            "{}: expected 24 hex chars, got {:?}",
            context,
            id
        );
    }
}
