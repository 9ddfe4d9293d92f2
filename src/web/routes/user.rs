use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Duration;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{self, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped, check_access,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, UserRole, WebError, WebResult,
        dto::user::{LoginBody, RegisterBody, UserCreateBody, UserUpdateBody},
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN},
        routes::{PaginationQuery, or_not_found},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/", post(user_create_handler))
        .route("/all-users", get(user_all_handler))
        .route("/page", get(user_list_handler))
        .route("/verify", get(user_verify_handler))
        .route(
            "/{id}",
            get(user_get_handler)
                .put(user_update_handler)
                .delete(user_delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/register", post(user_register_handler))
        .route("/login", post(user_login_handler))
        .route("/login-admin", post(user_login_admin_handler))
        .route("/logout", post(user_logout_handler))
        .merge(protected)
        .with_state(state)
}

fn set_auth_cookie(state: &AppState, cookies: &Cookies, user: &UserEntity) -> WebResult<()> {
    let ttl = Duration::hours(state.config().app().token_ttl_hours());
    let claims = UserClaims {
        sub: user.id().to_string(),
        email: user.email().to_string(),
        role: user.role().to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp(),
    };

    let token = auth::generate_token(claims, state.config().app().jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
    Ok(())
}

/// Looks the account up by email and checks the password.
async fn authenticate(state: &AppState, payload: &LoginBody) -> WebResult<UserEntity> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or(WebError::auth_invalid_credentials())?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    Ok(found)
}

#[utoipa::path(
    post,
    path = "/api/v1/user/register",
    request_body = RegisterBody,
    description = "Creates a new learner account and signs it in",
    responses(
        (status = 200, description = "User created successfully", body = UserEntity),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user"
)]
pub async fn user_register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    payload.validate().map_err(WebError::validation_failed)?;

    let admin = AuthenticatedUser::admin();
    let existing = UserEntity::find_by_email(state.pool(), &admin, &payload.email)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    if existing.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let data = UserEntityCreateUpdate::new(payload.name, payload.email, hash, UserRole::User);

    let created = UserEntity::create(state.pool(), &admin, data)
        .await
        .map_err(|e| WebError::resource_error(UserEntity::get_resource_type(), e))?;

    set_auth_cookie(&state, &cookies, &created)?;
    tracing::info!("user {} registered", created.id());

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/login",
    description = "Signs a user in",
    request_body = LoginBody,
    responses(
        (status = 200, description = "User signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
)]
pub async fn user_login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let found = authenticate(&state, &payload).await?;
    set_auth_cookie(&state, &cookies, &found)?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/login-admin",
    description = "Signs an administrator in",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Admin signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 403, description = "Account is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
)]
pub async fn user_login_admin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let found = authenticate(&state, &payload).await?;
    if found.role() != UserRole::Admin {
        return Err(WebError::auth_not_admin());
    }

    set_auth_cookie(&state, &cookies, &found)?;
    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/logout",
    description = "Drops the session cookie",
    responses(
        (status = 200, description = "Signed out"),
    ),
    tag = "user",
)]
pub async fn user_logout_handler(cookies: Cookies) -> impl IntoResponse {
    let mut cookie = Cookie::new(AUTH_TOKEN, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/api/v1/user/verify",
    description = "Tells whether the session cookie belongs to a user",
    responses(
        (status = 200, description = "Session is valid"),
        (status = 401, description = "No valid session"),
    ),
    tag = "user",
)]
pub async fn user_verify_handler(ctx: RequestContext) -> WebResult<impl IntoResponse> {
    let user = ctx.maybe_user();

    if user.is_none() {
        return Ok(StatusCode::UNAUTHORIZED);
    }

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/user",
    request_body = UserCreateBody,
    description = "Creates a user with an explicit role",
    responses(
        (status = 201, description = "User created", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<UserCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserEntity::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let role = payload.role();
    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let data = UserEntityCreateUpdate::new(payload.name, payload.email, hash, role);

    let created = UserEntity::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/all-users",
    responses(
        (status = 200, description = "Every user", body = Vec<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserEntity::get_resource_type())?;

    let users = UserEntity::all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserEntity::get_resource_type())?;

    let users = UserEntity::page(state.pool(), user, page.limit, page.offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}

async fn find_owned(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<UserEntity> {
    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))
        .and_then(or_not_found)?;

    check_access(state.pool(), user, &found, user.user_id())
        .await
        .map_err(|e| WebError::resource_error(UserEntity::get_resource_type(), e))?;

    Ok(found)
}

#[utoipa::path(
    get,
    path = "/api/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = find_owned(&state, user, id).await?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateBody,
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email taken by another user", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate().map_err(WebError::validation_failed)?;
    let found = find_owned(&state, user, id).await?;

    if let Some(email) = payload.email.as_deref() {
        let taken = UserEntity::find_by_email(state.pool(), user, email)
            .await
            .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

        if taken.is_some_and(|other| other.id() != found.id()) {
            return Err(WebError::registration_conflict());
        }
    }

    let hash = match payload.password.as_deref() {
        Some(password) => hash_password(password).map_err(WebError::server_crypt_error)?,
        None => found.hash().to_string(),
    };

    let data = UserEntityCreateUpdate::new(
        payload.name.unwrap_or_else(|| found.name().to_string()),
        payload.email.unwrap_or_else(|| found.email().to_string()),
        hash,
        found.role(),
    );

    let updated = found
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    description = "Deletes specified user together with their answers and progress",
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "user",
    security(
        ("cookie" = [])
    )
)]
pub async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = find_owned(&state, user, id).await?;

    found
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok(StatusCode::OK)
}
