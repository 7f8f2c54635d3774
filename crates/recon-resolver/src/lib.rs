//! Identity resolution for contact observations.
//!
//! Given an (email, phone) observation, the [`IdentityResolver`] finds every
//! stored contact sharing either value, elects the oldest primary among the
//! identities they belong to, folds the others into it, records any new
//! information as a secondary contact, and returns the consolidated view.
//!
//! Each resolution runs in a single store transaction. A transaction that
//! loses a race with a concurrent resolution is retried against a fresh
//! snapshot, a bounded number of times.

pub mod config;
pub mod error;
pub mod plan;
pub mod resolver;

pub use config::{EmptyObservationPolicy, ResolverConfig};
pub use error::{ResolveError, ResolveResult};
pub use plan::{reconcile, Reconciliation};
pub use resolver::IdentityResolver;
