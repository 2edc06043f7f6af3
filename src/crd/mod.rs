//! Custom Resource Definitions for the Syndesis operator
//!
//! The `Syndesis` resource carries the user's configuration overrides and
//! reports the outcome of configuration resolution in its status.

mod syndesis;

pub use syndesis::{ResolutionPhase, Syndesis, SyndesisSpec, SyndesisStatus};
