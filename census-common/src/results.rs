use std::io::Read;

use flate2::read::ZlibDecoder;
use sqlx::postgres::Postgres;
use thiserror::Error;

/// Errors for operations on the raw-result store. Payload decompression
/// failures surface here on read; submission never inspects the bytes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("result {0} does not exist")]
    NotFound(i64),
    #[error("failed to decompress stored payload: {0}")]
    Decompress(std::io::Error),
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
}

/// Store a submitted payload verbatim. The caller has already compressed it;
/// we do not look inside until processing time.
pub async fn submit<'c, E>(executor: E, data: &[u8]) -> Result<i64, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("INSERT INTO results (data, processed) VALUES ($1, FALSE) RETURNING id")
        .bind(data)
        .fetch_one(executor)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "INSERT".to_owned(),
            error,
        })
}

/// Read one stored payload exactly as submitted.
pub async fn fetch_compressed<'c, E>(executor: E, result_id: i64) -> Result<Vec<u8>, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT data FROM results WHERE id = $1")
        .bind(result_id)
        .fetch_optional(executor)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "SELECT".to_owned(),
            error,
        })?;

    data.ok_or(StoreError::NotFound(result_id))
}

/// Read one stored payload and inflate it back to the original document.
pub async fn fetch<'c, E>(executor: E, result_id: i64) -> Result<Vec<u8>, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let compressed = fetch_compressed(executor, result_id).await?;

    let mut decoder = ZlibDecoder::new(compressed.as_slice());
    let mut original = Vec::new();
    decoder
        .read_to_end(&mut original)
        .map_err(StoreError::Decompress)?;

    Ok(original)
}

/// Ids of results the pipeline has not decomposed yet, oldest first.
pub async fn unprocessed_ids<'c, E>(executor: E) -> Result<Vec<i64>, StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT id FROM results WHERE NOT processed ORDER BY id")
        .fetch_all(executor)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "SELECT".to_owned(),
            error,
        })
}

/// Flip the processed flag. Called inside the decomposition transaction so
/// the flag becomes visible only when the whole decomposition commits.
pub async fn mark_processed<'c, E>(executor: E, result_id: i64) -> Result<(), StoreError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query("UPDATE results SET processed = TRUE WHERE id = $1")
        .bind(result_id)
        .execute(executor)
        .await
        .map_err(|error| StoreError::QueryError {
            command: "UPDATE".to_owned(),
            error,
        })?;

    Ok(())
}
