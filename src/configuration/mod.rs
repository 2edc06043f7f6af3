//! Syndesis configuration: the tree, its sources and how they are combined
//!
//! Sources are applied in a fixed order, each later one overriding the earlier:
//! the packaged defaults, the persisted or generated secrets, the operator
//! environment, and finally the user's `Syndesis` custom resource.

pub mod env;
pub mod loader;
pub mod merge;
pub mod secret_store;
pub mod secrets;
mod types;

pub use env::{apply_env_overrides, EnvSource, ProcessEnv};
pub use loader::{load_from_file, load_from_slice};
pub use merge::Merge;
pub use secret_store::{KubeSecretStore, SecretStore, StaticSecretStore};
pub use secrets::{provision, SecretBundle};
pub use types::*;

use tracing::debug;
use url::Url;

use crate::crd::SyndesisSpec;
use crate::error::{Error, Result};

/// Stamp the installation namespace into the configuration
pub fn set_namespace(config: &mut Config, namespace: &str) {
    config.open_shift_project = namespace.to_string();
    config.syndesis.components.oauth.sar_namespace = namespace.to_string();
}

/// Deserialize a custom resource spec into the override tree
pub fn overrides_from_value(spec: serde_json::Value) -> Result<SyndesisConfig> {
    Ok(serde_json::from_value(spec)?)
}

/// Deserialize a raw custom resource spec document (JSON)
pub fn overrides_from_json(spec: &[u8]) -> Result<SyndesisConfig> {
    Ok(serde_json::from_slice(spec)?)
}

/// Apply the overrides declared in a custom resource spec
pub fn apply_custom_resource(config: &mut Config, spec: &SyndesisSpec) -> Result<()> {
    let overrides = overrides_from_value(serde_json::to_value(spec)?)?;
    config.syndesis.merge_from(&overrides);
    Ok(())
}

/// Point the database connection at the external database, if one is configured.
///
/// The external URL gets the configured database name as its path when it has
/// none, and replaces the managed connection URL.
pub fn apply_external_database(config: &mut Config) -> Result<()> {
    let database = &mut config.syndesis.components.database;
    if database.external_db_url.is_empty() {
        return Ok(());
    }

    let mut url = Url::parse(&database.external_db_url).map_err(|e| {
        Error::ConfigError(format!(
            "invalid external database URL {:?}: {}",
            database.external_db_url, e
        ))
    })?;
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(&format!("/{}", database.name));
    }

    debug!(url = %url, "Using external database");
    database.url = url.to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_namespace() {
        let mut config = Config::default();
        set_namespace(&mut config, "syndesis");
        assert_eq!(config.open_shift_project, "syndesis");
        assert_eq!(config.syndesis.components.oauth.sar_namespace, "syndesis");
    }

    #[test]
    fn test_custom_resource_overrides_keep_secrets() {
        let mut config = Config::default();
        config.syndesis.components.database.password = "generated".to_string();
        config.syndesis.components.server.image = "syndesis/server:1.9".to_string();

        let spec: SyndesisSpec = serde_json::from_value(serde_json::json!({
            "components": { "server": { "features": { "integrationLimit": 5 } } }
        }))
        .unwrap();
        apply_custom_resource(&mut config, &spec).unwrap();

        let components = &config.syndesis.components;
        assert_eq!(components.server.features.integration_limit, 5);
        assert_eq!(components.server.image, "syndesis/server:1.9");
        assert_eq!(components.database.password, "generated");
    }

    #[test]
    fn test_malformed_overrides_fail_to_deserialize() {
        let malformed = serde_json::json!({
            "components": { "server": { "features": { "integrationLimit": "many" } } }
        });
        let err = overrides_from_json(malformed.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, Error::DeserializationError(_)));

        let err = overrides_from_json(b"{not json").unwrap_err();
        assert!(matches!(err, Error::DeserializationError(_)));
    }

    #[test]
    fn test_external_database_gets_default_path() {
        let mut config = Config::default();
        let database = &mut config.syndesis.components.database;
        database.name = "syndesis".to_string();
        database.url = "postgresql://syndesis-db:5432/syndesis?sslmode=disable".to_string();
        database.external_db_url = "postgresql://db.example.com:5432".to_string();

        apply_external_database(&mut config).unwrap();
        assert_eq!(
            config.syndesis.components.database.url,
            "postgresql://db.example.com:5432/syndesis"
        );
    }

    #[test]
    fn test_external_database_keeps_explicit_path() {
        let mut config = Config::default();
        config.syndesis.components.database.name = "syndesis".to_string();
        config.syndesis.components.database.external_db_url =
            "postgresql://db.example.com:5432/custom".to_string();

        apply_external_database(&mut config).unwrap();
        assert_eq!(
            config.syndesis.components.database.url,
            "postgresql://db.example.com:5432/custom"
        );
    }

    #[test]
    fn test_without_external_database_url_is_untouched() {
        let mut config = Config::default();
        config.syndesis.components.database.url =
            "postgresql://syndesis-db:5432/syndesis".to_string();

        apply_external_database(&mut config).unwrap();
        assert_eq!(
            config.syndesis.components.database.url,
            "postgresql://syndesis-db:5432/syndesis"
        );
    }

    #[test]
    fn test_invalid_external_database_url() {
        let mut config = Config::default();
        config.syndesis.components.database.external_db_url = "not a url".to_string();
        assert!(matches!(
            apply_external_database(&mut config),
            Err(Error::ConfigError(_))
        ));
    }
}
