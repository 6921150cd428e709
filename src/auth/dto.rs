use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;
use crate::validation::{is_valid_email, Validator};

/// Request body for user registration.
///
/// Fields default so that a missing field is reported by validation
/// rather than as a malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub agree_to_terms: bool,
}

impl RegisterRequest {
    /// Normalises and validates in place.
    pub fn validate(&mut self) -> Result<(), crate::error::AppError> {
        self.email = crate::validation::normalize_email(&self.email);
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();

        let mut v = Validator::new();
        v.check(
            is_valid_email(&self.email),
            "email",
            "Please enter a valid email address",
        )
        .check(
            self.password.chars().count() >= 8,
            "password",
            "Password must be at least 8 characters long",
        )
        .check(
            self.confirm_password == self.password,
            "confirmPassword",
            "Password confirmation does not match password",
        )
        .check(!self.first_name.is_empty(), "firstName", "First name is required")
        .check(!self.last_name.is_empty(), "lastName", "Last name is required")
        .check(
            self.agree_to_terms,
            "agreeToTerms",
            "You must agree to the terms of use, privacy policy, and disclaimer",
        );
        v.finish()
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&mut self) -> Result<(), crate::error::AppError> {
        self.email = crate::validation::normalize_email(&self.email);
        let mut v = Validator::new();
        v.check(
            is_valid_email(&self.email),
            "email",
            "Please enter a valid email address",
        )
        .check(!self.password.is_empty(), "password", "Password is required");
        v.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}
fn default_history_limit() -> i64 {
    20
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    pub email_verified: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            created_at: u.created_at,
            last_login: u.last_login,
            email_verified: u.email_verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn valid() -> RegisterRequest {
        RegisterRequest {
            email: " Jane@Example.com ".into(),
            password: "longenough".into(),
            confirm_password: "longenough".into(),
            first_name: " Jane ".into(),
            last_name: "Doe".into(),
            agree_to_terms: true,
        }
    }

    #[test]
    fn register_normalises() {
        let mut req = valid();
        req.validate().unwrap();
        assert_eq!(req.email, "jane@example.com");
        assert_eq!(req.first_name, "Jane");
    }

    #[test]
    fn register_reports_each_bad_field() {
        let mut req = RegisterRequest {
            email: "nope".into(),
            password: "short".into(),
            confirm_password: "different".into(),
            ..Default::default()
        };
        let Err(AppError::Validation(errs)) = req.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            ["email", "password", "confirmPassword", "firstName", "lastName", "agreeToTerms"]
        );
    }

    #[test]
    fn register_body_uses_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email":"a@b.io","password":"x","confirmPassword":"x","firstName":"A","lastName":"B","agreeToTerms":true}"#,
        )
        .unwrap();
        assert_eq!(req.confirm_password, "x");
        assert!(req.agree_to_terms);
    }

    #[test]
    fn public_user_hides_hash() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            created_at: now,
            updated_at: now,
            last_login: None,
            login_attempts: 0,
            locked_until: None,
            is_active: true,
            email_verified: false,
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("firstName"));
        assert!(!json.contains("argon2"));
    }
}
