//! Operator environment overrides
//!
//! Image references and a few database volume settings can be pinned through
//! environment variables set on the operator deployment. They are applied after
//! secret provisioning and before the custom resource.

use std::collections::{BTreeMap, HashMap};

use super::merge::Merge;
use super::types::Config;

pub const ROUTE_HOSTNAME: &str = "ROUTE_HOSTNAME";
pub const POD_NAME: &str = "POD_NAME";
pub const DEV_SUPPORT: &str = "DEV_SUPPORT";
pub const TEST_SUPPORT: &str = "TEST_SUPPORT";

/// Source of operator environment variables
pub trait EnvSource: Send + Sync {
    /// Value of `key`, or `None` when it is unset or empty
    fn get(&self, key: &str) -> Option<String>;
}

/// The process environment
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Apply environment overrides onto `config`
pub fn apply_env_overrides(config: &mut Config, env: &dyn EnvSource) {
    let var = |key: &str| env.get(key).unwrap_or_default();

    let mut overlay = Config::default();
    let addons = &mut overlay.syndesis.addons;
    addons.dv.image = var("RELATED_IMAGE_DV");
    addons.camelk.image = var("RELATED_IMAGE_CAMELK");
    addons.todo.image = var("RELATED_IMAGE_TODO");

    let components = &mut overlay.syndesis.components;
    components.oauth.image = var("RELATED_IMAGE_OAUTH");
    components.ui.image = var("RELATED_IMAGE_UI");
    components.s2i.image = var("RELATED_IMAGE_S2I");
    components.prometheus.image = var("RELATED_IMAGE_PROMETHEUS");
    components.upgrade.image = var("RELATED_IMAGE_UPGRADE");
    components.meta.image = var("RELATED_IMAGE_META");
    components.server.image = var("RELATED_IMAGE_SERVER");
    components.amq.image = var("RELATED_IMAGE_AMQ");
    components.database.image = var("RELATED_IMAGE_DATABASE");
    components.database.exporter.image = var("RELATED_IMAGE_PSQL_EXPORTER");
    components.database.resources.volume_access_mode = var("DATABASE_VOLUME_ACCESS_MODE");
    components.database.resources.volume_storage_class = var("DATABASE_STORAGE_CLASS");
    components.database.resources.volume_name = var("DATABASE_VOLUME_NAME");

    config.merge_from(&overlay);

    config.dev_support = bool_from_env(env, DEV_SUPPORT, config.dev_support);
    let features = &mut config.syndesis.components.server.features;
    features.test_support = bool_from_env(env, TEST_SUPPORT, features.test_support);
}

/// Resolve a flag from `key`: exactly `"true"` enables it, and a flag that is
/// already enabled stays enabled whatever the variable holds.
pub fn bool_from_env(env: &dyn EnvSource, key: &str, current: bool) -> bool {
    match env.get(key) {
        Some(value) => current || value == "true",
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_image_overrides_replace_defaults() {
        let mut config = Config::default();
        config.syndesis.components.server.image = "syndesis/server:latest".to_string();
        config.syndesis.components.ui.image = "syndesis/ui:latest".to_string();

        apply_env_overrides(
            &mut config,
            &env(&[
                ("RELATED_IMAGE_SERVER", "registry/server@sha256:abc"),
                ("RELATED_IMAGE_PSQL_EXPORTER", "registry/exporter:1"),
                ("RELATED_IMAGE_UI", ""),
            ]),
        );

        let components = &config.syndesis.components;
        assert_eq!(components.server.image, "registry/server@sha256:abc");
        assert_eq!(components.database.exporter.image, "registry/exporter:1");
        assert_eq!(components.ui.image, "syndesis/ui:latest");
    }

    #[test]
    fn test_database_volume_settings() {
        let mut config = Config::default();
        config.syndesis.components.database.resources.volume_capacity = "1Gi".to_string();

        apply_env_overrides(
            &mut config,
            &env(&[
                ("DATABASE_VOLUME_ACCESS_MODE", "ReadWriteMany"),
                ("DATABASE_STORAGE_CLASS", "gp2"),
                ("DATABASE_VOLUME_NAME", "pv-0001"),
            ]),
        );

        let resources = &config.syndesis.components.database.resources;
        assert_eq!(resources.volume_access_mode, "ReadWriteMany");
        assert_eq!(resources.volume_storage_class, "gp2");
        assert_eq!(resources.volume_name, "pv-0001");
        assert_eq!(resources.volume_capacity, "1Gi");
    }

    #[test]
    fn test_bool_from_env() {
        let vars = env(&[("ON", "true"), ("OFF", "false"), ("ODD", "TRUE"), ("EMPTY", "")]);

        assert!(bool_from_env(&vars, "ON", false));
        assert!(!bool_from_env(&vars, "OFF", false));
        assert!(!bool_from_env(&vars, "ODD", false));
        assert!(bool_from_env(&vars, "OFF", true));
        assert!(bool_from_env(&vars, "EMPTY", true));
        assert!(!bool_from_env(&vars, "UNSET", false));
        assert!(bool_from_env(&vars, "UNSET", true));
    }

    #[test]
    fn test_feature_flags() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, &env(&[("DEV_SUPPORT", "true"), ("TEST_SUPPORT", "yes")]));

        assert!(config.dev_support);
        assert!(!config.syndesis.components.server.features.test_support);
    }
}
