use std::time::Duration;

use recon_types::{Contact, ContactId, Link, LinkPrecedence, NewContact};

use crate::error::StoreResult;

/// A store of contacts that hands out transactions.
///
/// Implementations must be thread-safe: many resolutions open transactions
/// concurrently. Two transactions that both commit must be equivalent to
/// running them one after the other.
pub trait ContactRepository: Send + Sync {
    /// Open a transaction that must finish within `timeout`.
    ///
    /// Returns `Err(StoreError::Unavailable)` if the store cannot be reached.
    fn begin(&self, timeout: Duration) -> StoreResult<Box<dyn ContactTransaction + '_>>;
}

/// One unit of work against a [`ContactRepository`].
///
/// Reads see committed data plus this transaction's own staged changes.
/// Nothing staged is visible to others until [`commit`](Self::commit);
/// dropping the transaction without committing discards it.
pub trait ContactTransaction {
    /// Contacts whose email equals `email` or whose phone equals `phone`,
    /// ordered by id. An absent argument matches nothing.
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> StoreResult<Vec<Contact>>;

    /// Read one contact by id. Returns `Ok(None)` if it does not exist.
    fn get(&mut self, id: ContactId) -> StoreResult<Option<Contact>>;

    /// Secondaries whose link points at `primary`, ordered by id.
    fn find_linked_to(&mut self, primary: ContactId) -> StoreResult<Vec<Contact>>;

    /// Stage a new contact. The id and timestamps are assigned immediately,
    /// the row becomes visible to others on commit.
    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact>;

    /// Change the link of an existing contact, provided its precedence is
    /// still `expected`.
    ///
    /// Fails with `StoreError::PrecedenceMismatch` if another change got
    /// there first.
    fn update_link(
        &mut self,
        id: ContactId,
        link: Link,
        expected: LinkPrecedence,
    ) -> StoreResult<()>;

    /// Make every staged change visible atomically.
    ///
    /// Fails with `StoreError::Conflict` if anything this transaction read
    /// has changed since it was read.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
