use serde::Deserialize;
use validator::Validate;

use crate::{auth::is_strong_password, web::UserRole};

fn validate_password(password: &str) -> Result<(), validator::ValidationError> {
    if is_strong_password(password) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("weak_password"))
    }
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        "admin" | "user" => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_role")),
    }
}

/// Self-service sign up, always creates a plain user.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct RegisterBody {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct LoginBody {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UserCreateBody {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    #[validate(custom = "validate_role")]
    pub role: Option<String>,
}

impl UserCreateBody {
    pub fn role(&self) -> UserRole {
        self.role
            .as_deref()
            .map(UserRole::from)
            .unwrap_or(UserRole::User)
    }
}

/// Fields left out keep their current value.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UserUpdateBody {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_body_rules() {
        let ok = RegisterBody {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "Strong@123".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterBody {
            name: String::new(),
            email: "not-an-email".into(),
            password: "weak".into(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn update_body_skips_missing_fields() {
        let body = UserUpdateBody {
            name: None,
            email: None,
            password: None,
        };
        assert!(body.validate().is_ok());

        let body = UserUpdateBody {
            name: None,
            email: None,
            password: Some("short".into()),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn create_body_role() {
        let body = UserCreateBody {
            name: "Root".into(),
            email: "root@example.com".into(),
            password: "Strong@123".into(),
            role: Some("admin".into()),
        };
        assert!(body.validate().is_ok());
        assert_eq!(body.role(), UserRole::Admin);

        let body = UserCreateBody {
            role: Some("owner".into()),
            ..body
        };
        assert!(body.validate().is_err());
    }
}
