use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;

/// Maximum connections in the shared pool. Writers hold one connection each
/// for their lifetime; everything else acquires per call.
const MAX_CONNECTIONS: u32 = 20;

pub async fn setup_database(dsn: &str) -> Result<PgPool, SqlxError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(10))
        .connect(dsn)
        .await?;

    Ok(pool)
}
