mod authentication;
pub mod config;
mod data_formats;
pub mod db_helpers;
mod errors;
mod handlers;
pub mod models;
pub mod pagination;

use anyhow::Context;
pub use anyhow::Result;
pub use authentication::get_jwt_token;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use config::Config;
pub use data_formats::*;
pub use errors::{FormErrors, RequestError};
use handlers::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::{net::TcpListener, str::FromStr, sync::Arc};
use tower_http::trace::TraceLayer;

pub type JsonResponse<T> = (StatusCode, Json<T>);

pub async fn run_app(
    app: Router,
    listener: TcpListener,
    db: SqlitePool,
    config: Config,
) -> Result<()> {
    let app = app
        .layer(Extension(Arc::new(db)))
        .layer(Extension(Arc::new(config)))
        .layer(TraceLayer::new_for_http());
    tracing::info!(address = %listener.local_addr()?, "server started");
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(db_url, "creating database");
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::debug!(db_url, "database already exists");
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .context("Invalid DATABASE_URL")?
        .foreign_keys(true);
    // Every connection to an in-memory database would see its own empty copy.
    let pool_options = if db_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };
    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("migrations completed");
    Ok(pool)
}

pub fn make_router() -> Router {
    Router::new()
        .route("/check_health", get(alive))
        .route("/", get(index))
        .route("/category/:category_slug", get(category_posts))
        .route("/profile/:username", get(profile))
        .route("/edit_profile", get(edit_profile_form).post(edit_profile))
        .route("/posts/create", get(create_post_form).post(create_post))
        .route("/posts/:post_id", get(post_detail))
        .route("/posts/:post_id/edit", get(edit_post_form).post(edit_post))
        .route(
            "/posts/:post_id/delete",
            get(delete_post_form).post(delete_post),
        )
        .route("/posts/:post_id/comment", post(add_comment))
        .route(
            "/posts/:post_id/edit_comment/:comment_id",
            get(edit_comment_form).post(edit_comment),
        )
        .route(
            "/posts/:post_id/delete_comment/:comment_id",
            get(delete_comment_form).post(delete_comment),
        )
        .route(
            "/auth/registration",
            get(registration_form).post(registration),
        )
        .route("/auth/login", get(login_form).post(login))
        .route("/auth/logout", post(logout))
        .fallback(not_found)
}
