//! # Database Persistence Layer
//!
//! Postgres persistence for grievance records via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, records live in
//! the `grievances` table and survive restarts. When absent, the service runs
//! on [`MemoryStore`](crate::store::MemoryStore) (suitable for development and
//! testing).

pub mod grievances;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and apply the embedded migrations.
pub async fn init_pool(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
