//! Request context, e.g. user id, its role, etc.
//!

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    model::ResourceType,
    web::{WebResult, error::WebError},
};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: Uuid,
    user_role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: Uuid, user_role: UserRole) -> Self {
        Self { user_id, user_role }
    }

    /// Actor for internal calls that are not made on behalf of a request.
    pub fn admin() -> Self {
        Self {
            user_role: UserRole::Admin,
            user_id: Uuid::max(), // admin ID
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn user_role(&self) -> UserRole {
        self.user_role
    }

    pub fn is_admin(&self) -> bool {
        self.user_role == UserRole::Admin
    }

    pub fn require_admin(&self, resource_type: ResourceType) -> WebResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(WebError::resource_forbidden(resource_type))
        }
    }

    /// Passes for the user itself and for admins.
    pub fn require_self_or_admin(
        &self,
        user_id: Uuid,
        resource_type: ResourceType,
    ) -> WebResult<()> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(WebError::resource_forbidden(resource_type))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    maybe_user: Option<AuthenticatedUser>,
}

impl RequestContext {
    pub fn new(maybe_user: Option<AuthenticatedUser>) -> Self {
        Self { maybe_user }
    }

    pub fn admin() -> Self {
        Self::new(Some(AuthenticatedUser::admin()))
    }

    pub fn maybe_user(&self) -> Option<&AuthenticatedUser> {
        self.maybe_user.as_ref()
    }

    pub fn user(&self) -> WebResult<&AuthenticatedUser> {
        self.maybe_user.as_ref().ok_or(WebError::auth_required())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>();
        if let Some(ctx) = ctx {
            Ok(ctx.clone())
        } else {
            Ok(RequestContext::new(None))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn role_from_str() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("user"), UserRole::User);
        assert_eq!(UserRole::from("something"), UserRole::User);
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }

    #[test]
    fn self_or_admin() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = AuthenticatedUser::new(me, UserRole::User);

        assert!(user.require_self_or_admin(me, ResourceType::UserProgress).is_ok());
        assert!(user.require_self_or_admin(other, ResourceType::UserProgress).is_err());
        assert!(user.require_admin(ResourceType::Section).is_err());

        let admin = AuthenticatedUser::admin();
        assert!(admin.require_self_or_admin(other, ResourceType::UserProgress).is_ok());
        assert!(admin.require_admin(ResourceType::Section).is_ok());
    }

    #[test]
    fn missing_user_is_unauthorized() {
        let ctx = RequestContext::new(None);
        let err = ctx.user().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
