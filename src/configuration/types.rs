//! The Syndesis configuration tree
//!
//! Every field is defaulted so that a partial document deserializes with empty
//! strings, `false` and `0` for what it omits. Those zero values are what the
//! secret provisioner and the override merger treat as "unset".

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fully resolved operator configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub allow_local_host: bool,
    pub productized: bool,
    /// Syndesis version
    pub version: String,
    /// Pull images from image tags instead of upstream sources
    pub dev_support: bool,
    /// Legacy flag setting `scheduled: true` on image streams
    pub scheduled: bool,
    /// Usually `syndesis` or `fuse-online`
    pub product_name: String,
    /// Extra Prometheus rules
    pub prometheus_rules: String,
    /// Namespace the installation is deployed into
    pub open_shift_project: String,
    pub open_shift_oauth_client_secret: String,
    pub open_shift_console_url: String,
    /// Pull secrets attached to service accounts; filled in by the operator
    pub image_pull_secrets: Vec<String>,
    /// Set when the running database must be upgraded before rollout
    pub database_needs_upgrade: bool,
    /// Component and add-on configuration, overridable from env and the custom resource
    pub syndesis: SyndesisConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SyndesisConfig {
    /// Start up with demo data
    pub demo_data: bool,
    /// Reference images by SHA instead of tag
    pub sha: bool,
    /// External hostname used to reach the installation
    pub route_hostname: String,
    pub components: ComponentsSpec,
    pub addons: AddonsSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentsSpec {
    pub ui: ImageConfiguration,
    pub s2i: ImageConfiguration,
    pub oauth: OauthConfiguration,
    pub server: ServerConfiguration,
    pub meta: MetaConfiguration,
    pub database: DatabaseConfiguration,
    pub prometheus: PrometheusConfiguration,
    pub grafana: GrafanaConfiguration,
    pub upgrade: UpgradeConfiguration,
    pub amq: ImageConfiguration,
}

/// Components that only carry an image reference (ui, s2i, amq)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfiguration {
    pub image: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OauthConfiguration {
    /// Image for the oauth proxy
    pub image: String,
    /// Secret used to encrypt oauth cookies
    pub cookie_secret: String,
    pub disable_sar_check: bool,
    /// Users need to list pods in this namespace to be granted access
    pub sar_namespace: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfiguration {
    pub image: String,
    /// PostgreSQL user used by the server
    pub user: String,
    /// Name of the PostgreSQL database
    pub name: String,
    /// Connection URL of the database
    pub url: String,
    /// When set, an external database is used instead of the managed one
    #[serde(rename = "externalDbURL", alias = "externalDbUrl")]
    pub external_db_url: String,
    pub resources: ResourcesWithPersistentVolume,
    pub exporter: ImageConfiguration,
    pub password: String,
    pub sampledb_password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PrometheusConfiguration {
    pub image: String,
    pub rules: String,
    pub resources: ResourcesWithVolume,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GrafanaConfiguration {
    pub resources: Resources,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfiguration {
    pub image: String,
    pub resources: Resources,
    pub features: ServerFeatures,
    /// Key used to encrypt stored secrets
    pub syndesis_encrypt_key: String,
    /// Key authenticating client side stored state
    pub client_state_authentication_key: String,
    /// Key encrypting client side stored state
    pub client_state_encryption_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaConfiguration {
    pub image: String,
    pub resources: ResourcesWithVolume,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UpgradeConfiguration {
    pub image: String,
    /// Volume where the database dump is saved during an upgrade
    pub resources: VolumeOnlyResources,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Resources {
    pub memory: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcesWithVolume {
    pub memory: String,
    pub volume_capacity: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcesWithPersistentVolume {
    pub memory: String,
    pub volume_capacity: String,
    pub volume_name: String,
    pub volume_access_mode: String,
    pub volume_storage_class: String,
    pub volume_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeOnlyResources {
    pub volume_capacity: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerFeatures {
    /// Maximum number of integrations a single user can create
    pub integration_limit: i32,
    /// Interval in seconds for checking integration state
    pub integration_state_check_interval: i32,
    pub deploy_integrations: bool,
    /// Enables the test-support endpoint on the backend API
    pub test_support: bool,
    pub open_shift_master: String,
    #[serde(rename = "managementUrlFor3scale")]
    pub management_url_for_3scale: String,
    pub maven_repositories: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonsSpec {
    pub jaeger: JaegerConfiguration,
    pub ops: AddonConfiguration,
    pub todo: TodoConfiguration,
    pub knative: AddonConfiguration,
    pub dv: DvConfiguration,
    pub camelk: CamelKConfiguration,
    pub public_api: PublicApiConfiguration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct JaegerConfiguration {
    pub enabled: bool,
    pub client_only: bool,
    pub operator_only: bool,
    pub query_uri: String,
    pub collector_uri: String,
    pub sampler_type: String,
    pub sampler_param: String,
    pub image_agent: String,
    pub image_all_in_one: String,
    pub image_operator: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AddonConfiguration {
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoConfiguration {
    /// Image for the todo sample app
    pub image: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DvConfiguration {
    pub image: String,
    pub enabled: bool,
    pub resources: Resources,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CamelKConfiguration {
    pub image: String,
    pub enabled: bool,
    pub camel_version: String,
    pub camel_k_runtime: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicApiConfiguration {
    pub enabled: bool,
    pub route_hostname: String,
    pub disable_sar_check: bool,
}

/// An add-on and whether the resolved configuration enables it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddonInstance {
    pub name: &'static str,
    pub enabled: bool,
}

const REDACTED: &str = "[REDACTED]";

fn redact(value: &mut String) {
    if !value.is_empty() {
        *value = REDACTED.to_string();
    }
}

impl Config {
    /// Add-ons in installation order with their enablement
    pub fn addons(&self) -> Vec<AddonInstance> {
        let addons = &self.syndesis.addons;
        vec![
            AddonInstance { name: "jaeger", enabled: addons.jaeger.enabled },
            AddonInstance { name: "ops", enabled: addons.ops.enabled },
            AddonInstance { name: "dv", enabled: addons.dv.enabled },
            AddonInstance { name: "camelk", enabled: addons.camelk.enabled },
            AddonInstance { name: "knative", enabled: addons.knative.enabled },
            AddonInstance { name: "publicApi", enabled: addons.public_api.enabled },
            AddonInstance { name: "todo", enabled: addons.todo.enabled },
        ]
    }

    /// Copy with every populated secret slot replaced, safe to print or log
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        redact(&mut copy.open_shift_oauth_client_secret);
        let components = &mut copy.syndesis.components;
        redact(&mut components.oauth.cookie_secret);
        redact(&mut components.database.password);
        redact(&mut components.database.sampledb_password);
        redact(&mut components.server.syndesis_encrypt_key);
        redact(&mut components.server.client_state_authentication_key);
        redact(&mut components.server.client_state_encryption_key);
        copy
    }

    /// True when the managed database is replaced by an external one
    pub fn uses_external_database(&self) -> bool {
        !self.syndesis.components.database.external_db_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_zero_values() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "productName": "syndesis",
            "syndesis": { "components": { "database": { "user": "syndesis" } } }
        }))
        .unwrap();

        assert_eq!(config.product_name, "syndesis");
        assert_eq!(config.syndesis.components.database.user, "syndesis");
        assert_eq!(config.syndesis.components.database.password, "");
        assert!(!config.syndesis.addons.todo.enabled);
        assert_eq!(config.syndesis.components.server.features.integration_limit, 0);
    }

    #[test]
    fn test_external_db_url_field_name() {
        let db: DatabaseConfiguration =
            serde_json::from_str(r#"{"externalDbURL": "postgresql://db:5432"}"#).unwrap();
        assert_eq!(db.external_db_url, "postgresql://db:5432");

        let json = serde_json::to_value(&db).unwrap();
        assert_eq!(json["externalDbURL"], "postgresql://db:5432");
    }

    #[test]
    fn test_addons_order() {
        let mut config = Config::default();
        config.syndesis.addons.camelk.enabled = true;

        let addons = config.addons();
        let names: Vec<_> = addons.iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec!["jaeger", "ops", "dv", "camelk", "knative", "publicApi", "todo"]
        );
        assert!(addons[3].enabled);
        assert!(!addons[0].enabled);
    }

    #[test]
    fn test_redacted_hides_only_populated_secrets() {
        let mut config = Config::default();
        config.syndesis.components.database.password = "hunter2".to_string();
        config.syndesis.components.database.user = "syndesis".to_string();

        let redacted = config.redacted();
        assert_eq!(redacted.syndesis.components.database.password, "[REDACTED]");
        assert_eq!(redacted.syndesis.components.database.user, "syndesis");
        assert_eq!(redacted.syndesis.components.oauth.cookie_secret, "");
        assert_eq!(config.syndesis.components.database.password, "hunter2");
    }
}
