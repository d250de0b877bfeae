use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use pulsedeck_core::limit::RateLimiter;
use pulsedeck_core::overview::{build_overview, OverviewQuery, OverviewResponse};
use pulsedeck_core::storage::PgMetricsStore;

mod error;

use error::ApiError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pulsedeck_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match pulsedeck_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let window = Duration::from_secs(settings.rate_limit_window_secs);
    let limiter = Arc::new(RateLimiter::new(settings.rate_limit_max_requests, window));
    spawn_limiter_sweep(limiter.clone(), window);

    let state = AppState { pool, limiter };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/workspaces/:workspace_id/metrics/overview",
            get(get_metrics_overview),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
    limiter: Arc<RateLimiter>,
}

async fn get_metrics_overview(
    State(state): State<AppState>,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::service_unavailable());
    };

    if !state.limiter.check(&workspace_id.to_string()) {
        return Err(ApiError::rate_limited());
    }

    let store = PgMetricsStore::new(pool.clone());
    let today = chrono::Local::now().date_naive();
    let now = chrono::Utc::now();

    let response = build_overview(&store, workspace_id, &query, today, now).await?;
    Ok(Json(response))
}

fn spawn_limiter_sweep(limiter: Arc<RateLimiter>, window: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            limiter.sweep();
        }
    });
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &pulsedeck_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
