//! # openapi-aggregator
//!
//! Aggregates per-service OpenAPI documents behind a reverse proxy into one
//! document per logical service, pruned to only the paths the proxy actually
//! exposes and renamed to avoid schema collisions across services.
//!
//! ## Pipeline
//!
//! ```text
//! ConfigReader -> ServiceGrouper -> { Fetch -> Transform analysis ->
//!   Reachability -> Prune -> Rename } per route -> Merge -> Cache -> HTTP
//! ```
//!
//! Each stage lives in its own module and is independently testable; the
//! `pipeline` module wires them together.

pub mod api;
pub mod cache;
pub mod config;
pub mod decorators;
pub mod errors;
pub mod fetch;
pub mod grouping;
pub mod merger;
pub mod observability;
pub mod pipeline;
pub mod pruner;
pub mod proxy;
pub mod reachability;
pub mod renamer;
pub mod transform;
pub mod utils;

pub use config::AppConfig;
pub use errors::{AggregatorError, Error, Result};

/// Crate version, read from `Cargo.toml` at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, read from `Cargo.toml` at compile time.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
