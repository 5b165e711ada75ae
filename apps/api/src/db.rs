use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Bound on how long a request waits for a free connection before erroring,
/// so pool exhaustion surfaces as a fast 500 instead of a hung request.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates the PostgreSQL connection pool shared by all handlers.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL (up to {max_connections} connections)...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
