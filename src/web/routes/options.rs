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
        entity::{Question, QuestionOption, QuestionOptionCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::question::{OptionCreateBody, OptionPatchBody},
        error::ErrorResponse,
        middlewares,
        routes::or_not_found,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(option_list_handler).post(option_create_handler))
        .route("/question/{question_id}", get(option_by_question_handler))
        .route(
            "/{id}",
            get(option_get_handler)
                .patch(option_patch_handler)
                .delete(option_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

async fn find_option(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> WebResult<QuestionOption> {
    QuestionOption::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionOption::get_resource_type(), e))
        .and_then(or_not_found)
}

#[utoipa::path(
    get,
    path = "/api/v1/question/option",
    responses(
        (status = 200, description = "Every option", body = Vec<QuestionOption>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;

    let options = QuestionOption::all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionOption::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(options)))
}

#[utoipa::path(
    post,
    path = "/api/v1/question/option",
    request_body = OptionCreateBody,
    description = "Adds an option. Marking it correct unmarks the question's other options",
    responses(
        (status = 201, description = "Option created", body = QuestionOption),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<OptionCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let created =
        QuestionOption::create(state.pool(), user, QuestionOptionCreateUpdate::from(payload))
            .await
            .map_err(|e| WebError::resource_error(QuestionOption::get_resource_type(), e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/question/option/question/{question_id}",
    params(("question_id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Options of the question", body = Vec<QuestionOption>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_by_question_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;

    Question::find_by_id(state.pool(), user, question_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Question::get_resource_type(), e))
        .and_then(or_not_found)?;

    let options = QuestionOption::find_all_by_question(state.pool(), user, question_id)
        .await
        .map_err(|e| WebError::resource_fetch_error(QuestionOption::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(options)))
}

#[utoipa::path(
    get,
    path = "/api/v1/question/option/{id}",
    params(("id" = Uuid, Path, description = "Option id")),
    responses(
        (status = 200, description = "Option found", body = QuestionOption),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Option not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;

    let option = find_option(&state, user, id).await?;
    Ok((StatusCode::OK, Json(option)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/question/option/{id}",
    params(("id" = Uuid, Path, description = "Option id")),
    request_body = OptionPatchBody,
    responses(
        (status = 200, description = "Option updated", body = QuestionOption),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Option not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields or no correct option", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_patch_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OptionPatchBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let option = find_option(&state, user, id).await?;
    let data = payload.merge(&option);
    let updated = option
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(QuestionOption::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/question/option/{id}",
    params(("id" = Uuid, Path, description = "Option id")),
    responses(
        (status = 204, description = "Option deleted"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Option not found", body = ErrorResponse),
        (status = 422, description = "It is the only correct option", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "option",
    security(
        ("cookie" = [])
    )
)]
pub async fn option_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(QuestionOption::get_resource_type())?;

    let option = find_option(&state, user, id).await?;
    option
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_error(QuestionOption::get_resource_type(), e))?;

    Ok(StatusCode::NO_CONTENT)
}
