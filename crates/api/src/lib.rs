//! Linksters API server library.
//!
//! Exposes configuration, shared state, the read cache, the synchronizing
//! services and the HTTP surface so integration tests and the binary
//! entrypoint build the exact same application.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod sync;
