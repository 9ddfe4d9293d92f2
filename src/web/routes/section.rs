use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        CrudRepository, ResourceTyped,
        entity::{QuestionWithOptionsRow, Section, SectionCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::section::{SectionCreateBody, SectionUpdateBody, SectionWithQuestions, TitleQuery},
        error::ErrorResponse,
        middlewares,
        routes::or_not_found,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(section_list_handler))
        .route("/by-title", get(section_by_title_handler))
        .route("/create", post(section_create_handler))
        .route(
            "/{id}",
            get(section_get_handler)
                .put(section_update_handler)
                .delete(section_delete_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

/// Sections with their questions and options nested.
async fn nest_questions(
    state: &AppState,
    user: &AuthenticatedUser,
    sections: Vec<Section>,
) -> WebResult<Vec<SectionWithQuestions>> {
    let ids: Vec<Uuid> = sections.iter().map(Section::id).collect();
    let rows = QuestionWithOptionsRow::fetch_by_sections(state.pool(), user, &ids)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    SectionWithQuestions::assemble(sections, rows, user.is_admin())
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
}

#[utoipa::path(
    get,
    path = "/api/v1/section",
    description = "Lists every section with its questions and options",
    responses(
        (status = 200, description = "Sections collected", body = Vec<SectionWithQuestions>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let sections = Section::all(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    let sections = nest_questions(&state, user, sections).await?;
    Ok((StatusCode::OK, Json(sections)))
}

#[utoipa::path(
    get,
    path = "/api/v1/section/by-title",
    params(TitleQuery),
    description = "Sections whose title matches exactly",
    responses(
        (status = 200, description = "Matching sections", body = Vec<SectionWithQuestions>),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_by_title_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<TitleQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let sections = Section::find_by_title(state.pool(), user, &query.title)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    let sections = nest_questions(&state, user, sections).await?;
    Ok((StatusCode::OK, Json(sections)))
}

#[utoipa::path(
    get,
    path = "/api/v1/section/{id}",
    params(("id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section found", body = SectionWithQuestions),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let section = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
        .and_then(or_not_found)?;

    let section = nest_questions(&state, user, vec![section])
        .await?
        .pop()
        .ok_or_else(|| WebError::resource_not_found(Section::get_resource_type()))?;

    Ok((StatusCode::OK, Json(section)))
}

#[utoipa::path(
    post,
    path = "/api/v1/section/create",
    request_body = SectionCreateBody,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SectionCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Section::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let created = Section::create(state.pool(), user, SectionCreateUpdate::from(payload))
        .await
        .map_err(|e| WebError::resource_error(Section::get_resource_type(), e))?;

    tracing::debug!("section {} created", created.id());
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/section/{id}",
    params(("id" = Uuid, Path, description = "Section id")),
    request_body = SectionUpdateBody,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 422, description = "Invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SectionUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Section::get_resource_type())?;
    payload.validate().map_err(WebError::validation_failed)?;

    let section = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
        .and_then(or_not_found)?;

    let data = payload.merge(&section);
    let updated = section
        .update(state.pool(), user, data)
        .await
        .map_err(|e| WebError::resource_error(Section::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/section/{id}",
    params(("id" = Uuid, Path, description = "Section id")),
    description = "Deletes the section with its questions, options, answers and progress",
    responses(
        (status = 204, description = "Section deleted"),
        (status = 401, description = "You had to be authorized to do this", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse),
    ),
    tag = "section",
    security(
        ("cookie" = [])
    )
)]
pub async fn section_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    user.require_admin(Section::get_resource_type())?;

    let section = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))
        .and_then(or_not_found)?;

    section
        .delete(state.pool(), user)
        .await
        .map_err(|e| WebError::resource_fetch_error(Section::get_resource_type(), e))?;

    tracing::info!("section {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
