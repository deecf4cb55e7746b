use std::collections::HashMap;

use sha2::{Digest, Sha256};
use sqlx::postgres::PgPool;

use crate::error::IngestError;

/// Collapse content-identical raw results down to one canonical record.
///
/// Scans the whole result set, groups by SHA-256 of the stored payload, and
/// deletes everything but one survivor per group. Runs before decomposition
/// in each processing cycle. Returns the number of rows deleted.
pub async fn deduplicate(pool: &PgPool) -> Result<u64, IngestError> {
    let rows: Vec<(i64, bool, Vec<u8>)> =
        sqlx::query_as("SELECT id, processed, data FROM results ORDER BY id")
            .fetch_all(pool)
            .await?;

    let mut groups: HashMap<String, Vec<(i64, bool)>> = HashMap::new();
    for (id, processed, data) in rows {
        let digest = format!("{:x}", Sha256::digest(&data));
        groups.entry(digest).or_default().push((id, processed));
    }

    let mut doomed: Vec<i64> = Vec::new();
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let survivor = choose_survivor(members);
        doomed.extend(
            members
                .iter()
                .map(|(id, _)| *id)
                .filter(|id| *id != survivor),
        );
    }

    if doomed.is_empty() {
        return Ok(0);
    }

    let deleted = sqlx::query("DELETE FROM results WHERE id = ANY($1)")
        .bind(&doomed)
        .execute(pool)
        .await?
        .rows_affected();

    metrics::counter!("census_duplicate_results_deleted_total").increment(deleted);
    tracing::info!(deleted, "collapsed duplicate results");

    Ok(deleted)
}

/// Members arrive in id order. A processed member wins so its decomposition
/// is not redone; ties resolve to the lowest id.
fn choose_survivor(members: &[(i64, bool)]) -> i64 {
    members
        .iter()
        .find(|(_, processed)| *processed)
        .or_else(|| members.first())
        .map(|(id, _)| *id)
        .expect("duplicate groups are never empty")
}
