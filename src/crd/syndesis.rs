//! Syndesis Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configuration::SyndesisConfig;

/// A Syndesis installation.
///
/// The spec has the shape of the `syndesis` subtree of the resolved
/// configuration; every field it sets overrides the operator defaults.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "syndesis.io",
    version = "v1beta2",
    kind = "Syndesis",
    namespaced,
    status = "SyndesisStatus",
    shortname = "syndesis",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Upgrade","type":"boolean","jsonPath":".status.databaseNeedsUpgrade"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SyndesisSpec {
    #[serde(flatten)]
    pub overrides: SyndesisConfig,
}

/// Outcome of the last configuration resolution
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// Configuration resolved; the upgrade decision is in `databaseNeedsUpgrade`
    Resolved,
    /// Resolution aborted; `message` carries the error
    ResolutionFailed,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyndesisStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ResolutionPhase>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Whether the managed database must be upgraded before rollout
    #[serde(default)]
    pub database_needs_upgrade: bool,

    /// `NoUpgrade`, `UpgradeNeeded` or `Undetermined`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_decision: Option<String>,

    /// RFC 3339 time of the last resolution attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_resolution_time: Option<String>,
}
