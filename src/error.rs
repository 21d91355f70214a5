use thiserror::Error;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

/// What the backend actually said. Carried verbatim into user-facing
/// messages.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend error {code}: {message}")]
    Api { code: String, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

impl BackendError {
    /// PostgREST's code for "zero rows where exactly one was requested".
    pub const NO_ROWS_CODE: &'static str = "PGRST116";

    pub fn is_no_rows(&self) -> bool {
        matches!(self, BackendError::Api { code, .. } if code == Self::NO_ROWS_CODE)
    }
}

/// Store-level failure taxonomy. A missing detailed course is `Ok(None)` on
/// the lookup itself, never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A list/read query failed. Surfaced to the view with a bounded manual
    /// retry affordance.
    #[error("fetch failed: {0}")]
    Fetch(#[source] BackendError),
    /// A mutation failed. Propagates to the caller; no automatic retry.
    #[error("write failed: {0}")]
    Write(#[source] BackendError),
    /// The dependent detailed course was deleted but the roadmap delete then
    /// failed. There is no compensating transaction; this needs manual
    /// reconciliation and must not be swallowed.
    #[error("roadmap {roadmap_id} is orphaned: its detailed course was deleted but the roadmap delete failed: {source}")]
    OrphanedDelete {
        roadmap_id: String,
        #[source]
        source: BackendError,
    },
}
