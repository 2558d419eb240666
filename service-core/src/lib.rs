//! service-core: Shared infrastructure for the api workspace.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
