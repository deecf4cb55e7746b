use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

use census_common::results;

use crate::api::ApiError;
use crate::state::AppState;

/// Accept one compressed census submission and store it verbatim. The
/// payload is not inspected until a processing cycle runs.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(), ApiError> {
    state.gate.check(&headers)?;

    let result_id = results::submit(&state.pool, body.as_ref()).await?;

    metrics::counter!("census_results_received_total").increment(1);
    tracing::debug!(result_id, bytes = body.len(), "stored new result");

    Ok(())
}

/// Return the decompressed original document for one stored result.
pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(result_id): Path<i64>,
) -> Result<Vec<u8>, ApiError> {
    state.gate.check(&headers)?;

    Ok(results::fetch(&state.pool, result_id).await?)
}

/// Kick off a processing cycle in the background and return immediately.
/// Concurrent triggers are safe: every result is decomposed in its own
/// serializable transaction.
pub async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<&'static str, ApiError> {
    state.gate.check(&headers)?;

    let pool = state.pool.clone();
    tokio::spawn(async move {
        let summary = census_ingest::process_pending(&pool).await;
        tracing::info!(
            deduplicated = summary.deduplicated,
            processed = summary.processed,
            failed = summary.failed,
            "processing cycle finished"
        );
    });

    Ok("")
}
