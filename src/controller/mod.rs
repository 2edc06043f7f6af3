//! Configuration resolution for the Syndesis reconciler
//!
//! This module runs the full resolution pass, decides on database upgrades,
//! and reports outcomes on the `Syndesis` status.

mod resolver;
mod route;
mod status;
mod upgrade;

pub use resolver::{fetch_syndesis_spec, resolve, resolve_from, Resolution, ResolveContext};
pub use route::{route_host, set_route, SYNDESIS_ROUTE};
pub use status::{report_resolution, resolution_status};
pub use upgrade::{
    compare_versions, decide_upgrade, has_upgrade_marker, UpgradeDecision, UPGRADE_MARKER_ENV,
};
