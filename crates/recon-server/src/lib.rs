//! HTTP server for contact reconciliation.
//!
//! Exposes the identify call over `POST /identify`, plus health and info
//! probes.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::ReconServer;
