use std::time::Duration;

use recon_types::{ContactId, LinkPrecedence};

/// Errors from contact store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A concurrent transaction changed data this transaction depended on.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A conditional link update found the row in an unexpected state.
    #[error("contact {id} is {actual}, expected {expected}")]
    PrecedenceMismatch {
        id: ContactId,
        expected: LinkPrecedence,
        actual: LinkPrecedence,
    },

    /// The transaction ran past its deadline.
    #[error("transaction exceeded its {limit:?} timeout")]
    Timeout { limit: Duration },

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The referenced contact does not exist.
    #[error("contact not found: {0}")]
    NotFound(ContactId),

    /// A link would point at a missing contact or at the contact itself.
    /// `id` is absent for a contact not yet inserted.
    #[error("{subject} cannot link to {target}: {reason}", subject = link_subject(.id))]
    InvalidLink {
        id: Option<ContactId>,
        target: ContactId,
        reason: String,
    },

    /// An imported row collides with an existing id.
    #[error("duplicate contact id: {0}")]
    DuplicateId(ContactId),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Returns `true` if retrying the whole transaction against a fresh
    /// snapshot may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::PrecedenceMismatch { .. })
    }
}

fn link_subject(id: &Option<ContactId>) -> String {
    match id {
        Some(id) => format!("contact {id}"),
        None => "new contact".to_string(),
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
