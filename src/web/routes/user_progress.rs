use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{Section, UserEntity, UserProgress, UserProgressCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::progress::{OverallProgress, ProgressCreateBody, ProgressQuery, ProgressValue},
        error::ErrorResponse,
        middlewares,
        routes::or_not_found,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/create", post(progress_create_handler))
        .route("/update/{user_id}/{section_id}", patch(progress_update_handler))
        .route(
            "/calculate-progress/{user_id}/{section_id}",
            post(progress_calculate_handler),
        )
        .route(
            "/calculate-overall-progress/{user_id}",
            post(progress_overall_handler),
        )
        .route("/progress", get(progress_filter_handler))
        .route("/progress/{user_id}/{section_id}", get(progress_get_handler))
        .route("/all/{user_id}", get(progress_all_handler))
        .route("/completed/{user_id}", get(progress_completed_handler))
        .route("/reset/{user_id}/{section_id}", patch(progress_reset_handler))
        .route("/delete/{user_id}/{section_id}", delete(progress_delete_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// 404 unless both the user and the section exist.
async fn ensure_pair_exists(
    state: &AppState,
    user: &AuthenticatedUser,
    user_id: Uuid,
    section_id: Uuid,
) -> WebResult<()> {
    UserEntity::find_by_id(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))
        .and_then(or_not_found)?;

    Section::find_by_id(state.pool(), user, section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
        .and_then(or_not_found)?;

    Ok(())
}

async fn find_pair(
    state: &AppState,
    user: &AuthenticatedUser,
    user_id: Uuid,
    section_id: Uuid,
) -> WebResult<UserProgress> {
    UserProgress::find_by_user_and_section(state.pool(), user, user_id, section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))
        .and_then(or_not_found)
}

#[utoipa::path(
    post,
    path = "/api/v1/user-progress/create",
    request_body = ProgressCreateBody,
    description = "Returns the progress row of the pair, creating an empty one if needed",
    responses(
        (status = 200, description = "Progress row", body = UserProgress),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 404, description = "User or section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ProgressCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(payload.user_id, UserProgress::get_resource_type())?;
    ensure_pair_exists(&state, user, payload.user_id, payload.section_id).await?;

    let data = UserProgressCreateUpdate::new(payload.user_id, payload.section_id);
    let progress = UserProgress::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/user-progress/update/{user_id}/{section_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("section_id" = Uuid, Path, description = "Section id"),
    ),
    description = "Recomputes the stored progress of the pair from the user's answers",
    responses(
        (status = 200, description = "Progress refreshed", body = UserProgress),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 404, description = "User or section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((user_id, section_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;
    ensure_pair_exists(&state, user, user_id, section_id).await?;

    let progress = UserProgress::recompute(state.pool(), user, user_id, section_id)
        .await
        .map_err(|e| WebError::resource_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    post,
    path = "/api/v1/user-progress/calculate-progress/{user_id}/{section_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("section_id" = Uuid, Path, description = "Section id"),
    ),
    description = "Percentage of the section answered correctly. Nothing is stored",
    responses(
        (status = 200, description = "Section percentage", body = ProgressValue),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 404, description = "User or section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_calculate_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((user_id, section_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;
    ensure_pair_exists(&state, user, user_id, section_id).await?;

    let progress = UserProgress::section_progress(state.pool(), user, user_id, section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(ProgressValue { progress })))
}

#[utoipa::path(
    post,
    path = "/api/v1/user-progress/calculate-overall-progress/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    description = "Mean of the user's section percentages",
    responses(
        (status = 200, description = "Overall percentage", body = OverallProgress),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_overall_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;

    let overall_progress = UserProgress::overall(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(OverallProgress { overall_progress })))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-progress/progress",
    params(ProgressQuery),
    description = "Progress rows matching the filters. Learners only ever see their own rows",
    responses(
        (status = 200, description = "Matching rows", body = Vec<UserProgress>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_filter_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let user_id = match query.user_id {
        Some(id) => {
            user.require_self_or_admin(id, UserProgress::get_resource_type())?;
            Some(id)
        }
        None if user.is_admin() => None,
        None => Some(user.user_id()),
    };

    let rows = UserProgress::filter(state.pool(), user, user_id, query.section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-progress/progress/{user_id}/{section_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("section_id" = Uuid, Path, description = "Section id"),
    ),
    responses(
        (status = 200, description = "Progress row", body = UserProgress),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 404, description = "No progress for the pair", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((user_id, section_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;

    let progress = find_pair(&state, user, user_id, section_id).await?;
    Ok((StatusCode::OK, Json(progress)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-progress/all/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Every progress row of the user", body = Vec<UserProgress>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_all_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;

    let rows = UserProgress::find_all_by_user(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-progress/completed/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Completed sections of the user", body = Vec<UserProgress>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your progress", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_completed_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserProgress::get_resource_type())?;

    let rows = UserProgress::find_completed_by_user(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/user-progress/reset/{user_id}/{section_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("section_id" = Uuid, Path, description = "Section id"),
    ),
    description = "Zeroes the progress of the pair. Answers are kept",
    responses(
        (status = 200, description = "Progress reset", body = UserProgress),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "No progress for the pair", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_reset_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((user_id, section_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserProgress::get_resource_type())?;

    let progress = find_pair(&state, user, user_id, section_id).await?;
    let reset = progress
        .reset(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_error(UserProgress::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(reset)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user-progress/delete/{user_id}/{section_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("section_id" = Uuid, Path, description = "Section id"),
    ),
    responses(
        (status = 204, description = "Progress deleted"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "No progress for the pair", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-progress",
    security(
        ("cookie" = [])
    )
)]
pub async fn progress_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((user_id, section_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserProgress::get_resource_type())?;

    let progress = find_pair(&state, user, user_id, section_id).await?;
    progress
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserProgress::get_resource_type(), e))?;

    Ok(StatusCode::NO_CONTENT)
}
