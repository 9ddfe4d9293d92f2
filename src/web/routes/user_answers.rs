use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, ResourceTyped, check_access,
        entity::{UserAnswer, UserAnswerCreateUpdate, UserEntity},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::answer::{AnswerCreateBody, AnswerPatchBody},
        error::ErrorResponse,
        middlewares,
        routes::or_not_found,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(answer_list_handler).post(answer_submit_handler))
        .route("/user/{user_id}", get(answer_by_user_handler))
        .route(
            "/{id}",
            get(answer_get_handler)
                .patch(answer_patch_handler)
                .delete(answer_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_owned(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<UserAnswer> {
    let answer = UserAnswer::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))
        .and_then(or_not_found)?;

    check_access(state.pool(), user, &answer, user.user_id())
        .await
        .map_err(|e| WebError::resource_error(UserAnswer::get_resource_type(), e))?;

    Ok(answer)
}

#[utoipa::path(
    post,
    path = "/api/v1/user-answers",
    request_body = AnswerCreateBody,
    description = "Submits an answer, grades it and refreshes the section progress",
    responses(
        (status = 201, description = "Answer graded and stored", body = UserAnswer),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Answering for someone else", body = ErrorResponse),
        (status = 404, description = "User, question or option not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<AnswerCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate().map_err(WebError::validation_failed)?;

    let user_id = payload.user_id.unwrap_or(user.user_id());
    if user_id != user.user_id() {
        user.require_admin(UserAnswer::get_resource_type())?;
        UserEntity::find_by_id(state.pool(), user, user_id)
            .await
            .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))
            .and_then(or_not_found)?;
    }

    let data = UserAnswerCreateUpdate {
        user_id,
        question_id: payload.question_id,
        answer_text: payload.answer_text,
    };

    let created = UserAnswer::create(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(UserAnswer::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-answers",
    responses(
        (status = 200, description = "Every answer", body = Vec<UserAnswer>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(UserAnswer::get_resource_type())?;

    let answers = UserAnswer::all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(answers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-answers/{id}",
    params(("id" = Uuid, Path, description = "Answer id")),
    responses(
        (status = 200, description = "Answer found", body = UserAnswer),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your answer", body = ErrorResponse),
        (status = 404, description = "Answer not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let answer = find_owned(&state, user, id).await?;

    Ok((StatusCode::OK, Json(answer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/user-answers/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Answers of the user", body = Vec<UserAnswer>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your answers", body = ErrorResponse),
        (status = 404, description = "The user has no answers", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_by_user_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_self_or_admin(user_id, UserAnswer::get_resource_type())?;

    let answers = UserAnswer::find_all_by_user(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserAnswer::get_resource_type(), e))?;

    if answers.is_empty() {
        return Err(WebError::resource_not_found(UserAnswer::get_resource_type()));
    }

    Ok((StatusCode::OK, Json(answers)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/user-answers/{id}",
    params(("id" = Uuid, Path, description = "Answer id")),
    request_body = AnswerPatchBody,
    description = "Changes an answer. It is graded again and progress is refreshed",
    responses(
        (status = 200, description = "Answer regraded", body = UserAnswer),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your answer", body = ErrorResponse),
        (status = 404, description = "Answer, question or option not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_patch_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerPatchBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    payload.validate().map_err(WebError::validation_failed)?;

    let answer = find_owned(&state, user, id).await?;
    let data = payload.merge(&answer);
    let updated = answer
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(UserAnswer::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/user-answers/{id}",
    params(("id" = Uuid, Path, description = "Answer id")),
    responses(
        (status = 204, description = "Answer deleted, progress refreshed"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "Not your answer", body = ErrorResponse),
        (status = 404, description = "Answer not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "user-answers",
    security(
        ("cookie" = [])
    )
)]
pub async fn answer_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let answer = find_owned(&state, user, id).await?;

    answer
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_error(UserAnswer::get_resource_type(), e))?;

    Ok(StatusCode::NO_CONTENT)
}
