use anyhow::Context;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string, e.g. `postgres://user@localhost:5432/rssdb`
    pub db_dsn: String,
    /// Number of fetch workers (N)
    pub fetch_concurrency: usize,
    /// Number of writer workers (M)
    pub write_concurrency: usize,
    /// Seconds added to `next_poll_at` after a successful fetch
    pub default_poll_seconds: i64,
    /// Max concurrent in-flight requests per remote host
    pub per_host_limit: usize,
    /// When true, the success path advances `next_poll_at` by the feed's own
    /// `poll_interval` column instead of `default_poll_seconds`
    pub honor_feed_interval: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let db_dsn = env::var("DB_DSN")
            .context("DB_DSN must be set (e.g. postgres://user@localhost:5432/rssdb)")?;

        let config = Config {
            db_dsn,
            fetch_concurrency: parse_var("FETCH_CONCURRENCY", 20)?,
            write_concurrency: parse_var("WRITE_CONCURRENCY", 10)?,
            default_poll_seconds: parse_var("DEFAULT_POLL_SECONDS", 3600)?,
            per_host_limit: parse_var("PER_HOST_LIMIT", 2)?,
            honor_feed_interval: parse_var("HONOR_FEED_INTERVAL", false)?,
        };

        anyhow::ensure!(config.fetch_concurrency > 0, "FETCH_CONCURRENCY must be positive");
        anyhow::ensure!(config.write_concurrency > 0, "WRITE_CONCURRENCY must be positive");
        anyhow::ensure!(config.default_poll_seconds > 0, "DEFAULT_POLL_SECONDS must be positive");
        anyhow::ensure!(config.per_host_limit > 0, "PER_HOST_LIMIT must be positive");

        Ok(config)
    }
}

/// Reads an environment variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
