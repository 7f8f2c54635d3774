use recon_store::StoreError;
use thiserror::Error;

/// Errors surfaced by identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The observation cannot be resolved as given.
    #[error("invalid observation: {0}")]
    Validation(String),

    /// Concurrent resolutions kept invalidating this one.
    #[error("resolution conflicted {attempts} times: {reason}")]
    Conflict { attempts: u32, reason: String },

    /// The store failed or timed out. Not retried.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored links do not form a valid identity forest.
    #[error("identity integrity violation: {0}")]
    Integrity(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
