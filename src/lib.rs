//! Syndesis configuration resolution
//!
//! Produces the effective operator configuration from the packaged defaults,
//! the persisted secret bundle, the operator environment and the `Syndesis`
//! custom resource, and decides whether the managed PostgreSQL database needs
//! an upgrade before rollout.

pub mod configuration;
pub mod controller;
pub mod crd;
pub mod database;
pub mod error;
pub mod telemetry;

pub use error::{Error, Result};
