use crate::{
    model::ResourceTyped,
    web::{AppState, WebError, WebResult, doc::ApiDoc},
};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod options;
pub mod questions;
pub mod section;
pub mod user;
pub mod user_answers;
pub mod user_progress;

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    limit: i64,
    offset: i64,
}

/// Unwraps a lookup result or answers 404 for the resource.
pub(crate) fn or_not_found<T: ResourceTyped>(found: Option<T>) -> WebResult<T> {
    found.ok_or_else(|| WebError::resource_not_found(T::get_resource_type()))
}

pub fn build_app<S: Send + Sync + Clone + 'static>(state: AppState) -> Router<S> {
    let docs = state.config().app().docs();

    let mut router = Router::new()
        .nest("/api/v1/user", user::routes(state.clone()))
        .nest("/api/v1/section", section::routes(state.clone()))
        .nest("/api/v1/questions", questions::routes(state.clone()))
        .nest("/api/v1/question/option", options::routes(state.clone()))
        .nest("/api/v1/user-answers", user_answers::routes(state.clone()))
        .nest("/api/v1/user-progress", user_progress::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if docs {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}
