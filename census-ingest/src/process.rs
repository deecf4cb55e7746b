use census_common::normalize::normalize;
use census_common::results::{self, StoreError};
use census_common::submission::Submission;
use sqlx::postgres::PgPool;

use crate::error::IngestError;
use crate::{decompose, dedup, resolver};

/// What one triggered processing cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub deduplicated: u64,
    pub processed: u64,
    pub failed: u64,
}

/// Run one full processing cycle: collapse duplicate raw results, then
/// decompose every unprocessed result, each in its own transaction.
///
/// A failing result is logged and left unprocessed; it never aborts the
/// cycle or touches sibling results.
pub async fn process_pending(pool: &PgPool) -> CycleSummary {
    let mut summary = CycleSummary::default();

    match dedup::deduplicate(pool).await {
        Ok(deleted) => summary.deduplicated = deleted,
        Err(error) => tracing::error!(%error, "deduplication pass failed"),
    }

    let pending = match results::unprocessed_ids(pool).await {
        Ok(ids) => ids,
        Err(error) => {
            tracing::error!(%error, "could not list unprocessed results");
            return summary;
        }
    };

    for result_id in pending {
        match process_one(pool, result_id).await {
            Ok(true) => {
                summary.processed += 1;
                metrics::counter!("census_results_processed_total").increment(1);
            }
            // Removed by deduplication after we listed it.
            Ok(false) => {}
            Err(error) => {
                summary.failed += 1;
                metrics::counter!("census_results_failed_total").increment(1);
                tracing::error!(result_id, %error, "failed to process result");
            }
        }
    }

    summary
}

/// Decompose a single raw result. The whole sequence — resolve (with purge
/// on resubmission), per-section inserts, processed mark — is one
/// serializable transaction, so overlapping triggers cannot duplicate a
/// device or interleave a purge with inserts.
async fn process_one(pool: &PgPool, result_id: i64) -> Result<bool, IngestError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let payload = match results::fetch_compressed(&mut *tx, result_id).await {
        Ok(payload) => payload,
        Err(StoreError::NotFound(_)) => return Ok(false),
        Err(error) => return Err(error.into()),
    };

    let submission = Submission::from_compressed(&payload)?;
    let name = normalize(&submission.device_name);
    let build_description =
        resolver::build_description(&name, submission.system_properties.as_ref());

    let device = resolver::resolve(&mut tx, &name, &build_description).await?;
    decompose::decompose(&mut tx, &device, &submission).await?;
    results::mark_processed(&mut *tx, result_id).await?;

    tx.commit().await?;

    Ok(true)
}
