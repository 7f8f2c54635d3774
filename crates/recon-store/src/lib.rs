//! Contact storage for identity reconciliation.
//!
//! The resolver never touches rows directly. It opens a transaction on a
//! [`ContactRepository`], reads and stages changes through the returned
//! [`ContactTransaction`], and commits. Either every staged change becomes
//! visible or none does.
//!
//! # Storage Backends
//!
//! - [`InMemoryContactStore`] -- optimistic, serializable, `RwLock`-guarded
//!   rows for tests, demos, and embedding
//!
//! # Design Rules
//!
//! 1. A contact's email, phone, and creation time never change after insert.
//! 2. Ids come from a monotonic sequence and are never reused.
//! 3. Every read inside a transaction is validated again at commit; a
//!    transaction that observed stale data fails with [`StoreError::Conflict`].
//! 4. Each transaction runs under a deadline; overruns fail with
//!    [`StoreError::Timeout`].

pub mod error;
pub mod memory;
pub mod traits;
pub mod validation;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryContactStore, InMemoryTransaction};
pub use traits::{ContactRepository, ContactTransaction};
pub use validation::{validate_forest, ForestReport, Violation, ViolationKind};
