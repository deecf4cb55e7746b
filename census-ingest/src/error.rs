use census_common::results::StoreError;
use census_common::submission::SubmissionError;
use thiserror::Error;

/// Everything that can sink one result during a processing cycle. Failures
/// are caught at the result boundary; they never cross to sibling results.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{section}: submitted {submitted} names but linked {linked} rows")]
    CardinalityMismatch {
        section: &'static str,
        submitted: usize,
        linked: u64,
    },
}
