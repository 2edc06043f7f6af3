//! Database upgrade decision
//!
//! Decides whether the managed PostgreSQL instance must be upgraded before the
//! next rollout. Probing is read-only and fail-soft: when the versions cannot be
//! established the outcome is [`UpgradeDecision::Undetermined`], which callers
//! treat as "no upgrade this pass".

use std::fmt;

use k8s_openapi::api::core::v1::Container;
use tracing::{info, instrument, warn};

use crate::configuration::Config;
use crate::database::{ConnectionParams, DatabaseProbe, PostgresVersion, DATABASE_CONTAINER};

/// Env entry on the database container marking an upgrade already in flight
pub const UPGRADE_MARKER_ENV: &str = "POSTGRESQL_UPGRADE";

/// Result of the upgrade decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeDecision {
    NoUpgrade,
    UpgradeNeeded,
    /// Versions could not be established; no upgrade is performed
    Undetermined { reason: String },
}

impl UpgradeDecision {
    /// Whether the upgrade executor should run
    pub fn needs_upgrade(&self) -> bool {
        matches!(self, UpgradeDecision::UpgradeNeeded)
    }

    fn undetermined(reason: impl fmt::Display) -> Self {
        UpgradeDecision::Undetermined {
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for UpgradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeDecision::NoUpgrade => write!(f, "NoUpgrade"),
            UpgradeDecision::UpgradeNeeded => write!(f, "UpgradeNeeded"),
            UpgradeDecision::Undetermined { .. } => write!(f, "Undetermined"),
        }
    }
}

/// True when the database engine container already carries the upgrade marker
pub fn has_upgrade_marker(containers: &[Container]) -> bool {
    containers
        .iter()
        .filter(|c| c.name == DATABASE_CONTAINER)
        .flat_map(|c| c.env.iter().flatten())
        .any(|env| env.name == UPGRADE_MARKER_ENV)
}

/// Compare running and target versions
pub fn compare_versions(current: PostgresVersion, target: PostgresVersion) -> UpgradeDecision {
    if current < target {
        UpgradeDecision::UpgradeNeeded
    } else {
        UpgradeDecision::NoUpgrade
    }
}

/// Decide whether the managed database of `namespace` needs an upgrade
#[instrument(skip(config, probe))]
pub async fn decide_upgrade(
    config: &Config,
    namespace: &str,
    probe: &dyn DatabaseProbe,
) -> UpgradeDecision {
    if config.uses_external_database() {
        info!("External database configured, skipping upgrade check");
        return UpgradeDecision::NoUpgrade;
    }

    match probe.database_containers(namespace).await {
        Ok(Some(containers)) if has_upgrade_marker(&containers) => {
            info!("Database upgrade already in progress, keeping it");
            return UpgradeDecision::UpgradeNeeded;
        }
        Ok(_) => {}
        Err(e) => warn!("Unable to read database DeploymentConfig: {}", e),
    }

    let database = &config.syndesis.components.database;
    let params = ConnectionParams::managed(&database.user, &database.password, &database.name);

    let current = match probe.current_version(&params).await {
        Ok(banner) => PostgresVersion::parse_banner(&banner),
        Err(e) => Err(e),
    };
    let current = match current {
        Ok(version) => version,
        Err(e) => {
            let decision = UpgradeDecision::undetermined(format!(
                "unable to determine running PostgreSQL version: {e}"
            ));
            warn!(%decision, "{}", e);
            return decision;
        }
    };

    let target = match probe.target_version(namespace).await {
        Ok(banner) => PostgresVersion::parse_banner(&banner),
        Err(e) => Err(e),
    };
    let target = match target {
        Ok(version) => version,
        Err(e) => {
            let decision = UpgradeDecision::undetermined(format!(
                "unable to determine target PostgreSQL version from the init container: {e}"
            ));
            warn!(%decision, "{}", e);
            return decision;
        }
    };

    let decision = compare_versions(current, target);
    info!(
        source_postgres_version = %current,
        target_postgres_version = %target,
        perform_upgrade = decision.needs_upgrade(),
        "PostgreSQL upgrade summary"
    );
    decision
}
