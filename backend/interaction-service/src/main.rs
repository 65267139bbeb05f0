use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interaction_service::config::{Config, StoreBackend, StoreConfig};
use interaction_service::handlers::{self, AppState};
use interaction_service::metrics::serve_metrics;
use interaction_service::repository::{MemoryStore, PgStore, RecordStore};

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL environment variable not set")?;

            // Prepared statement caching disabled for PgBouncer transaction mode
            let connect_options = PgConnectOptions::from_str(url)
                .context("Failed to parse DATABASE_URL")?
                .statement_cache_capacity(0);

            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect_with(connect_options)
                .await
                .context("Failed to connect to database")?;

            let store = PgStore::new(pool);
            store
                .health_check()
                .await
                .context("Failed to verify database connection")?;
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;
            info!("Database pool created, migrations completed");

            Ok(Arc::new(store))
        }
    }
}

async fn readiness(state: web::Data<AppState>) -> impl Responder {
    match state.store.health_check().await {
        Ok(()) => HttpResponse::Ok().body("READY"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            HttpResponse::ServiceUnavailable().body("NOT READY")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.log_format);

    info!(
        env = %config.app.env,
        http_port = config.app.http_port,
        backend = ?config.store.backend,
        purge_comments = config.cascade.purge_comments,
        "Starting interaction-service"
    );

    let store = build_store(&config.store).await?;
    let state = web::Data::new(AppState::new(store, &config));

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("HTTP server listening on http://{}", http_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(readiness))
            .route("/metrics", web::get().to(serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("interaction-service shutting down");
    Ok(())
}
