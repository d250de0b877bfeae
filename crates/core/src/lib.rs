pub mod domain;
pub mod error;
pub mod limit;
pub mod overview;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 60;
    const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub rate_limit_max_requests: u32,
        pub rate_limit_window_secs: u64,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                rate_limit_max_requests: env_parsed(
                    "RATE_LIMIT_MAX_REQUESTS",
                    DEFAULT_RATE_LIMIT_MAX_REQUESTS,
                ),
                rate_limit_window_secs: env_parsed(
                    "RATE_LIMIT_WINDOW_SECS",
                    DEFAULT_RATE_LIMIT_WINDOW_SECS,
                ),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }
    }

    fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
