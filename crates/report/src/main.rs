use anyhow::Context;
use clap::Parser;
use pulsedeck_core::overview::{build_overview, OverviewQuery};
use pulsedeck_core::storage::PgMetricsStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Prints the KPI overview for one workspace as JSON. Runs the same
/// computation the API serves, against DATABASE_URL.
#[derive(Debug, Parser)]
#[command(name = "pulsedeck_report")]
struct Args {
    #[arg(long)]
    workspace_id: Uuid,

    /// Range start (YYYY-MM-DD); requires --date-to.
    #[arg(long)]
    date_from: Option<String>,

    /// Range end (YYYY-MM-DD); requires --date-from.
    #[arg(long)]
    date_to: Option<String>,

    /// One of: today, yesterday, last_7_days, last_30_days, last_90_days.
    /// Wins over explicit dates.
    #[arg(long)]
    preset: Option<String>,

    /// One of: vs_previous_period, vs_same_period_last_year.
    #[arg(long)]
    comparison: Option<String>,

    /// Comma-separated platform identifiers to restrict to.
    #[arg(long)]
    platforms: Option<String>,

    /// Comma-separated account identifiers to restrict to.
    #[arg(long)]
    accounts: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

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

    let args = Args::parse();

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    pulsedeck_core::storage::migrate(&pool).await?;

    let query = OverviewQuery {
        date_preset: args.preset,
        date_from: args.date_from,
        date_to: args.date_to,
        comparison_mode: args.comparison,
        platforms: args.platforms,
        accounts: args.accounts,
    };

    let store = PgMetricsStore::new(pool);
    let today = chrono::Local::now().date_naive();
    let now = chrono::Utc::now();

    let response = build_overview(&store, args.workspace_id, &query, today, now)
        .await
        .map_err(|e| {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            err
        })?;

    tracing::info!(workspace_id = %args.workspace_id, insights = response.insights.len(), "overview computed");

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{rendered}");

    Ok(())
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
