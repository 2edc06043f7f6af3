//! Reporting resolution outcomes on the Syndesis status

use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::info;

use crate::crd::{ResolutionPhase, Syndesis, SyndesisStatus};
use crate::error::{Error, Result};

use super::resolver::Resolution;
use super::upgrade::UpgradeDecision;

const FIELD_MANAGER: &str = "syndesis-operator";

/// Status describing `outcome`
pub fn resolution_status(outcome: &Result<Resolution>) -> SyndesisStatus {
    let now = chrono::Utc::now().to_rfc3339();
    match outcome {
        Ok(resolution) => SyndesisStatus {
            phase: Some(ResolutionPhase::Resolved),
            message: match &resolution.upgrade {
                UpgradeDecision::Undetermined { reason } => {
                    Some(format!("Upgrade check undetermined: {reason}"))
                }
                _ => Some("Configuration resolved".to_string()),
            },
            database_needs_upgrade: resolution.upgrade.needs_upgrade(),
            upgrade_decision: Some(resolution.upgrade.to_string()),
            last_resolution_time: Some(now),
        },
        Err(e) => SyndesisStatus {
            phase: Some(ResolutionPhase::ResolutionFailed),
            message: Some(e.to_string()),
            database_needs_upgrade: false,
            upgrade_decision: None,
            last_resolution_time: Some(now),
        },
    }
}

/// Patch the status of Syndesis `name` in `namespace` with the outcome of a resolution
pub async fn report_resolution(
    client: &Client,
    namespace: &str,
    name: &str,
    outcome: &Result<Resolution>,
) -> Result<()> {
    let api: Api<Syndesis> = Api::namespaced(client.clone(), namespace);
    let status = resolution_status(outcome);

    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .map_err(Error::KubeError)?;

    info!(
        "Reported resolution {:?} for {}/{}",
        status.phase, namespace, name
    );
    Ok(())
}
