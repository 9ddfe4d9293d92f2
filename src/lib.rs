use crate::auth::hash_password;
use crate::model::entity::{UserEntity, UserEntityCreateUpdate};
use crate::model::{CrudRepository, DbConnection, ModelManager};
use crate::utils::signal::shutdown_signal;
use crate::web::{AuthenticatedUser, UserRole};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "statt";

/// Creates the account from `[app.admin]` unless a user with that email
/// already exists.
#[tracing::instrument(skip_all)]
pub async fn ensure_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let Some(seed) = config.app().admin() else {
        return Ok(());
    };

    let actor = AuthenticatedUser::admin();
    if UserEntity::find_by_email(mm, &actor, seed.email())
        .await?
        .is_some()
    {
        return Ok(());
    }

    let hash = hash_password(seed.password())?;
    let data = UserEntityCreateUpdate::new(seed.name(), seed.email(), hash, UserRole::Admin);
    let created = UserEntity::create(mm, &actor, data).await?;

    tracing::info!("admin account {} created", created.email());
    Ok(())
}

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = config::Config::get_or_init(use_local).await;
    let db = DbConnection::connect(config.app().database_uri())?;

    tracing::debug!("applying migrations...");
    sqlx::migrate!().run(db.pool()).await?;

    let mm = ModelManager::new(db);
    ensure_admin(&mm, config).await?;

    let state = AppState::new(mm, config);
    let app = web::routes::build_app(state.clone());
    Ok((state, app))
}

/// Same as [`build_server`] on an already migrated pool.
pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let config = config::Config::get_or_init(true).await;

    let mm = ModelManager::new(db);
    ensure_admin(&mm, config).await?;

    let state = AppState::new(mm, config);
    let app = web::routes::build_app(state.clone());
    Ok((state, app))
}

#[tracing::instrument]
pub async fn serve() -> AppResult<()> {
    let (state, app) = build_server().await?;
    let bindto = state.config().host().bindto();
    let listener = TcpListener::bind(bindto).await?;

    tracing::info!("axum is starting at: {}", bindto);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    serve().await?;
    Ok(())
}
