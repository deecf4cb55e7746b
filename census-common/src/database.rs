use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("migrations failed with: {error}")]
    MigrationError { error: sqlx::migrate::MigrateError },
}

pub async fn get_pool(url: &str, max_connections: u32) -> Result<PgPool, DatabaseError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|error| DatabaseError::ConnectionError { error })
}

/// Apply the workspace migrations. Tables are created on first boot; the
/// binary runs this before serving.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(|error| DatabaseError::MigrationError { error })
}
