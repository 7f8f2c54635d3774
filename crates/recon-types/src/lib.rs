//! Foundation types for contact identity reconciliation.
//!
//! Every other recon crate depends on `recon-types`.
//!
//! # Key Types
//!
//! - [`ContactId`] -- Monotonic row identifier assigned by the store
//! - [`Contact`] -- One observed (email, phone) pair and its place in an identity
//! - [`Link`] -- Primary, or Secondary pointing at its primary
//! - [`Observation`] -- Normalized (email, phone) input to a resolution
//! - [`ConsolidatedContact`] -- Aggregated view of one identity
//! - [`IdentifyRequest`] / [`IdentifyResponse`] -- Wire shapes of the identify call

pub mod consolidated;
pub mod contact;
pub mod error;
pub mod observation;

pub use consolidated::{ConsolidatedContact, IdentifyResponse};
pub use contact::{Contact, ContactId, Link, LinkPrecedence, NewContact};
pub use error::TypeError;
pub use observation::{IdentifyRequest, Observation};
