use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{App, HttpServer};
use anyhow::{Context, anyhow};

mod aggregate;
mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod ingest;
mod model;
mod models;
mod report;
mod routes;
mod store;

use auth::password::hash_password_blocking;
use config::{Config, StoreBackend};
use db::init_db;
use store::{MemoryStore, MySqlStore, RecordStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

fn cors(allowed_origins: &[String]) -> Cors {
    let cors = allowed_origins.iter().fold(Cors::default(), |cors, origin| {
        if origin == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(origin)
        }
    });
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        // the dashboard names downloaded reports from it
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .max_age(3600)
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let pool = init_db(url).await.context("Failed to connect to database")?;
            info!("Using MySQL record store");
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn seed_admin(store: &dyn RecordStore, config: &Config) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        info!("ADMIN_USERNAME/ADMIN_PASSWORD not set, skipping admin seed");
        return Ok(());
    };

    let hash = hash_password_blocking(password.clone())
        .await
        .map_err(|e| anyhow!("Failed to hash admin password: {e}"))?;
    if store.ensure_admin(username, &hash).await? {
        info!(username = %username, "Admin account created");
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store = open_store(&config).await?;
    seed_admin(store.as_ref(), &config).await?;

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(cors(&config.allowed_origins))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            // Shared state, auth and protected routes with rate limiting
            .configure(|cfg| routes::configure_app(cfg, store.clone(), config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
