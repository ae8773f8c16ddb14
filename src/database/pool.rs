use crate::error::Result;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::time::Duration;

pub async fn create_pool(database_url: &str, timeout: Duration) -> Result<PgPool> {
    let statement_timeout_ms = timeout.as_millis();
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET statement_timeout = {}", statement_timeout_ms).as_str())
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| crate::error::Error::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
