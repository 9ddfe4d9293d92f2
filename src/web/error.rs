use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationCookieInvalid, cookie: {cookie}. Error: {error}")]
    AuthenticationCookieInvalid {
        cookie: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,

    #[error("AuthenticationNotAdmin")]
    AuthenticationNotAdmin,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceConflict: {resource_type:?}")]
    ResourceConflict { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ValidationFailed: {0}")]
    ValidationFailed(#[from] validator::ValidationErrors),

    #[error("ValidationInvariant: {resource_type:?}. {message}")]
    ValidationInvariant {
        resource_type: ResourceType,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user with this email already exists.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationInvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AuthenticationCookieInvalid { .. } => StatusCode::UNAUTHORIZED,
            Self::AuthenticationNotAdmin => StatusCode::FORBIDDEN,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationCookieInvalid { .. } => {
                String::from("Authentication error, cookie invalid.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
            Self::AuthenticationNotAdmin => {
                String::from("Authentication error, account is not an admin.")
            }
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { resource_type } => {
                format!("Resource error, {resource_type} not found.")
            }
            Self::ResourceForbidden { resource_type } => {
                format!("Resource error, access to {resource_type} forbidden.")
            }
            Self::ResourceConflict { resource_type } => {
                format!("Resource error, {resource_type} already exists.")
            }
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
        }
    }
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNPROCESSABLE_ENTITY
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ValidationFailed(errors) => {
                let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
                fields.sort_unstable();
                format!("Validation error, invalid fields: {}.", fields.join(", "))
            }
            Self::ValidationInvariant { message, .. } => format!("Validation error, {message}."),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("ValidationError - {0}")]
    ValidationError(#[from] ValidationError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_conflict(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    /// Keeps the category of a database error: missing rows stay 404, broken
    /// invariants 422 and so on. Only genuine failures become 500.
    pub fn resource_error(r#type: ResourceType, error: DatabaseError) -> Self {
        match error {
            DatabaseError::Forbidden => Self::resource_forbidden(r#type),
            DatabaseError::NotFound(missing) => Self::resource_not_found(missing),
            DatabaseError::Conflict(conflicting) => Self::resource_conflict(conflicting),
            DatabaseError::Invariant {
                resource_type,
                message,
            } => Self::validation_invariant(resource_type, message),
            error => Self::resource_fetch_error(r#type, error),
        }
    }

    pub fn validation_failed(errors: validator::ValidationErrors) -> Self {
        Self::ValidationError(ValidationError::ValidationFailed(errors))
    }

    pub fn validation_invariant<S: Into<String>>(r#type: ResourceType, message: S) -> Self {
        Self::ValidationError(ValidationError::ValidationInvariant {
            resource_type: r#type,
            message: message.into(),
        })
    }

    pub fn auth_cookie_invalid<S: Into<String>>(
        cookie: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationCookieInvalid {
            cookie: cookie.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn auth_not_admin() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationNotAdmin)
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::ValidationError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::ValidationError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message for the client
    pub message: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();
        let display = self.client_display();

        let body = ErrorResponse {
            message: display,
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::*;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn database_errors_keep_their_category() {
        let cases = [
            (DatabaseError::Forbidden, StatusCode::FORBIDDEN),
            (
                DatabaseError::NotFound(ResourceType::Question),
                StatusCode::NOT_FOUND,
            ),
            (
                DatabaseError::Conflict(ResourceType::User),
                StatusCode::CONFLICT,
            ),
            (
                DatabaseError::invariant(ResourceType::Question, "broken"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DatabaseError::SqlxError(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            let web = WebError::resource_error(ResourceType::Section, error);
            assert_eq!(web.status_code(), status);
        }
    }

    #[test]
    fn not_found_names_the_missing_resource() {
        let web = WebError::resource_error(
            ResourceType::UserAnswer,
            DatabaseError::NotFound(ResourceType::QuestionOption),
        );
        assert_eq!(web.client_display(), "Resource error, option not found.");
    }

    #[test]
    fn validation_lists_fields() {
        let errors = Named {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        let web = WebError::validation_failed(errors);
        assert_eq!(web.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(web.client_display(), "Validation error, invalid fields: name.");
    }
}
