use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// User entity as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, 24 hex characters
    pub id: String,
    pub name: String,
    /// Unique across all users (exact match)
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body fields exactly as sent
///
/// Types are checked while converting into the DTOs below, so a field with the
/// wrong JSON type is reported next to every other violation instead of
/// aborting deserialization. `null` counts as absent.
#[derive(Debug, Default, Deserialize)]
struct UserBody {
    name: Option<Value>,
    email: Option<Value>,
    age: Option<Value>,
}

/// Typed fields plus the names of those whose JSON type was wrong
struct TypedFields {
    name: Option<String>,
    email: Option<String>,
    age: Option<i32>,
    type_errors: Vec<&'static str>,
}

impl From<UserBody> for TypedFields {
    fn from(body: UserBody) -> Self {
        let mut type_errors = Vec::new();

        let mut text = |field: &'static str, value: Option<Value>| match value {
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                type_errors.push(field);
                None
            }
            None => None,
        };
        let name = text("name", body.name);
        let email = text("email", body.email);

        let age = match body.age {
            Some(Value::Number(n)) => match whole_number(&n) {
                Some(age) => Some(age),
                None => {
                    type_errors.push("age");
                    None
                }
            },
            Some(_) => {
                type_errors.push("age");
                None
            }
            None => None,
        };

        Self {
            name,
            email,
            age,
            type_errors,
        }
    }
}

/// Integral JSON numbers, `30.0` included. Values outside `i32` saturate so the
/// range rule reports them.
fn whole_number(n: &Number) -> Option<i32> {
    let wide = match n.as_i64() {
        Some(i) => i,
        None => {
            let f = n.as_f64()?;
            if !f.is_finite() || f.fract() != 0.0 {
                return None;
            }
            // Saturating cast.
            f as i64
        }
    };
    Some(i32::try_from(wide).unwrap_or(if wide < 0 { i32::MIN } else { i32::MAX }))
}

fn type_violation(field: &str) -> ValidationError {
    let message = match field {
        "name" => "name must be a string",
        "email" => "Please enter a valid email address",
        _ => "age must be a whole number",
    };
    ValidationError::new("type").with_message(Cow::Borrowed(message))
}

/// Constraints every provided field must satisfy, on create and update alike
#[derive(Validate)]
struct FieldRules {
    #[validate(length(min = 3, max = 50, message = "name must be between 3 and 50 characters"))]
    name: Option<String>,

    #[validate(email(message = "Please enter a valid email address"))]
    email: Option<String>,

    #[validate(range(min = 0, max = 120, message = "age must be between 0 and 120"))]
    age: Option<i32>,
}

/// Run the shared field rules and add one violation per mistyped field.
fn check_fields(
    name: &Option<String>,
    email: &Option<String>,
    age: Option<i32>,
    type_errors: &[&'static str],
) -> ValidationErrors {
    let rules = FieldRules {
        name: name.clone(),
        email: email.clone(),
        age,
    };
    let mut errors = rules.validate().err().unwrap_or_else(ValidationErrors::new);

    for &field in type_errors {
        errors.add(field, type_violation(field));
    }
    errors
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// DTO for creating a new user
///
/// Every field is optional at the serde level so that a body missing several
/// fields, or sending them with the wrong type, reports each of them as a
/// violation instead of failing on the first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "UserBody")]
pub struct CreateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    /// Fields the client sent with the wrong JSON type
    pub type_errors: Vec<&'static str>,
}

impl From<UserBody> for CreateUser {
    fn from(body: UserBody) -> Self {
        let fields = TypedFields::from(body);
        Self {
            name: fields.name,
            email: fields.email,
            age: fields.age,
            type_errors: fields.type_errors,
        }
    }
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = check_fields(&self.name, &self.email, self.age, &self.type_errors);

        let required = [
            ("name", self.name.is_some(), "name should not be empty"),
            ("email", self.email.is_some(), "email should not be empty"),
            ("age", self.age.is_some(), "age should not be empty"),
        ];
        for (field, present, message) in required {
            // A mistyped field already carries its own violation.
            if !present && !self.type_errors.contains(&field) {
                errors.add(
                    field,
                    ValidationError::new("required").with_message(Cow::Borrowed(message)),
                );
            }
        }

        into_result(errors)
    }
}

/// DTO for a partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "UserBody")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    /// Fields the client sent with the wrong JSON type
    pub type_errors: Vec<&'static str>,
}

impl From<UserBody> for UpdateUser {
    fn from(body: UserBody) -> Self {
        let fields = TypedFields::from(body);
        Self {
            name: fields.name,
            email: fields.email,
            age: fields.age,
            type_errors: fields.type_errors,
        }
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        into_result(check_fields(
            &self.name,
            &self.email,
            self.age,
            &self.type_errors,
        ))
    }
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }
}

/// A validated [`CreateUser`], ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl TryFrom<CreateUser> for NewUser {
    type Error = ValidationErrors;

    fn try_from(input: CreateUser) -> Result<Self, Self::Error> {
        input.validate()?;

        match (input.name, input.email, input.age) {
            (Some(name), Some(email), Some(age)) => Ok(NewUser { name, email, age }),
            // `required` already rejected any missing field
            _ => Err(ValidationErrors::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_helpers::violation_messages;

    fn john() -> CreateUser {
        CreateUser {
            name: Some("John Doe".to_string()),
            email: Some("john.doe@example.com".to_string()),
            age: Some(30),
            ..Default::default()
        }
    }

    fn create_from(body: serde_json::Value) -> CreateUser {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_create_converts() {
        let new_user = NewUser::try_from(john()).unwrap();
        assert_eq!(new_user.name, "John Doe");
        assert_eq!(new_user.email, "john.doe@example.com");
        assert_eq!(new_user.age, 30);
    }

    #[test]
    fn test_empty_create_reports_every_field() {
        let errors = NewUser::try_from(CreateUser::default()).unwrap_err();
        assert_eq!(
            violation_messages(&errors),
            vec![
                "age should not be empty",
                "email should not be empty",
                "name should not be empty",
            ]
        );
    }

    #[test]
    fn test_create_bounds() {
        let input = CreateUser {
            name: Some("Jo".to_string()),
            email: Some("not-an-email".to_string()),
            age: Some(121),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(
            violation_messages(&errors),
            vec![
                "Please enter a valid email address",
                "age must be between 0 and 120",
                "name must be between 3 and 50 characters",
            ]
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        let mut input = john();
        input.name = Some("é".repeat(50));
        assert!(input.validate().is_ok());

        input.name = Some("x".repeat(51));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_age_edges_accepted() {
        for age in [0, 120] {
            let mut input = john();
            input.age = Some(age);
            assert!(input.validate().is_ok(), "age {age} should be valid");
        }
    }

    #[test]
    fn test_update_fields_optional_but_checked() {
        assert!(UpdateUser::default().validate().is_ok());
        assert!(UpdateUser::default().is_empty());

        let update = UpdateUser {
            age: Some(-1),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_mistyped_fields_reported_with_other_violations() {
        let input = create_from(serde_json::json!({
            "name": "Jo",
            "email": "nope",
            "age": "thirty",
        }));
        assert_eq!(input.type_errors, vec!["age"]);

        let errors = input.validate().unwrap_err();
        assert_eq!(
            violation_messages(&errors),
            vec![
                "Please enter a valid email address",
                "age must be a whole number",
                "name must be between 3 and 50 characters",
            ]
        );
    }

    #[test]
    fn test_mistyped_field_is_not_reported_as_missing() {
        let input = create_from(serde_json::json!({
            "name": 42,
            "email": "john.doe@example.com",
            "age": 30,
        }));

        let errors = input.validate().unwrap_err();
        assert_eq!(violation_messages(&errors), vec!["name must be a string"]);
    }

    #[test]
    fn test_age_accepts_integral_float() {
        let input = create_from(serde_json::json!({
            "name": "John Doe",
            "email": "john.doe@example.com",
            "age": 30.0,
        }));

        assert_eq!(input.age, Some(30));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_age_fraction_and_overflow() {
        let fraction = create_from(serde_json::json!({ "age": 30.5 }));
        assert_eq!(fraction.age, None);
        assert_eq!(fraction.type_errors, vec!["age"]);

        let huge = create_from(serde_json::json!({ "age": 10_000_000_000_i64 }));
        assert_eq!(huge.age, Some(i32::MAX));
        let errors = UpdateUser::from(UserBody {
            age: Some(serde_json::json!(-10_000_000_000_i64)),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert_eq!(
            violation_messages(&errors),
            vec!["age must be between 0 and 120"]
        );
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let update: UpdateUser =
            serde_json::from_value(serde_json::json!({ "name": null, "age": 31 })).unwrap();

        assert_eq!(update.name, None);
        assert_eq!(update.age, Some(31));
        assert!(update.type_errors.is_empty());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_user_serializes_with_id() {
        let now = Utc::now();
        let user = User {
            id: "507f1f77bcf86cd799439011".to_string(),
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            age: 30,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "507f1f77bcf86cd799439011");
        assert_eq!(json["age"], 30);
        assert!(json.get("_id").is_none());
    }
}
