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
        CrudRepository, ResourceTyped,
        entity::{Question, QuestionCreateUpdate, QuestionWithOptionsRow, Section},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        dto::question::{QuestionCreateBody, QuestionUpdateBody, QuestionWithOptions},
        error::ErrorResponse,
        middlewares,
        routes::or_not_found,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(question_list_handler).post(question_create_handler))
        .route("/section/{section_id}", get(question_by_section_handler))
        .route(
            "/{id}",
            get(question_get_handler)
                .put(question_update_handler)
                .delete(question_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/v1/questions",
    request_body = QuestionCreateBody,
    description = "Creates a question with its options. Exactly one option has to be correct",
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields or option set", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Question::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let created = Question::create(state.pool(), user, QuestionCreateUpdate::from(payload))
        .await
        .map_err(|e| WebError::resource_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/questions",
    description = "Lists every question with its options",
    responses(
        (status = 200, description = "Questions collected", body = Vec<QuestionWithOptions>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let rows = QuestionWithOptionsRow::fetch_all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    let questions = QuestionWithOptions::from_rows(rows, user.is_admin())
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(questions)))
}

#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question found", body = QuestionWithOptions),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let row = QuestionWithOptionsRow::fetch_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(Question::get_resource_type()))?;

    let question = QuestionWithOptions::from_row(row, user.is_admin()).map_err(|e| {
        WebError::resource_fetch_error(Question::get_resource_type(), e.into())
    })?;

    Ok((StatusCode::OK, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/v1/questions/section/{section_id}",
    params(("section_id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Questions of the section", body = Vec<QuestionWithOptions>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_by_section_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    Section::find_by_id(state.pool(), user, section_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
        .and_then(or_not_found)?;

    let rows = QuestionWithOptionsRow::fetch_by_sections(state.pool(), user, &[section_id])
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    let questions = QuestionWithOptions::from_rows(rows, user.is_admin())
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(questions)))
}

#[utoipa::path(
    put,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = QuestionUpdateBody,
    description = "Updates a question. A given `options` list replaces the current option set",
    responses(
        (status = 200, description = "Question updated", body = Question),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Question, section or option not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields or option set", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Question::get_resource_type())?;
    payload.validate_all().map_err(WebError::validation_failed)?;

    let question = Question::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))
        .and_then(or_not_found)?;

    let data = payload.merge(&question);
    let updated = question
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(Question::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    description = "Deletes the question with its options and answers",
    responses(
        (status = 204, description = "Question deleted"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "questions",
    security(
        ("cookie" = [])
    )
)]
pub async fn question_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Question::get_resource_type())?;

    let question = Question::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))
        .and_then(or_not_found)?;

    question
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))?;

    Ok(StatusCode::NO_CONTENT)
}
