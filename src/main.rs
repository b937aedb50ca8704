use feedsink::config::Config;
use feedsink::infrastructure::database::setup_database;
use feedsink::infrastructure::supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    // Default to info level in production; use RUST_LOG env var to override
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedsink=info".into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Setup database
    tracing::info!("Connecting to database");
    let db_pool = setup_database(&config.db_dsn).await?;

    // Run migrations
    tracing::info!("Running database migrations");
    sqlx::migrate!().run(&db_pool).await?;
    tracing::info!("Migrations complete");

    // Run the ingestion engine until a termination signal arrives
    supervisor::run(config, db_pool).await
}
