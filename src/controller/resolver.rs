//! End-to-end configuration resolution
//!
//! One pass: load defaults, stamp the namespace, provision secrets, apply the
//! operator environment, apply the custom resource, point at an external
//! database if one is configured, then decide on a database upgrade. Any error
//! before the upgrade decision aborts the pass; the decision itself never fails.

use std::path::Path;

use kube::api::{Api, DynamicObject};
use kube::discovery::ApiResource;
use kube::Client;
use rand::RngCore;
use tracing::{info, instrument};

use crate::configuration::{
    self, apply_env_overrides, apply_external_database, Config, EnvSource, SecretStore,
};
use crate::crd::{Syndesis, SyndesisSpec};
use crate::database::DatabaseProbe;
use crate::error::{Error, Result};

use super::upgrade::{decide_upgrade, UpgradeDecision};

/// External collaborators consulted during resolution.
///
/// `None` collaborators mean the engine runs without cluster access: secrets
/// are generated from scratch and the upgrade decision is undetermined.
pub struct ResolveContext<'a> {
    pub secret_store: Option<&'a dyn SecretStore>,
    pub database_probe: Option<&'a dyn DatabaseProbe>,
    pub env: &'a dyn EnvSource,
}

/// Resolved configuration together with the upgrade decision behind
/// `config.database_needs_upgrade`
#[derive(Clone, Debug)]
pub struct Resolution {
    pub config: Config,
    pub upgrade: UpgradeDecision,
}

/// Resolve the configuration of the installation in `namespace`, starting from
/// the default document at `template`
#[instrument(skip_all, fields(namespace = %namespace, template = %template.as_ref().display()))]
pub async fn resolve<R: RngCore + Send + ?Sized>(
    template: impl AsRef<Path> + Send,
    namespace: &str,
    spec: &SyndesisSpec,
    ctx: &ResolveContext<'_>,
    rng: &mut R,
) -> Result<Resolution> {
    let defaults = configuration::load_from_file(template.as_ref())?;
    resolve_from(defaults, namespace, spec, ctx, rng).await
}

/// Resolve starting from already loaded defaults
pub async fn resolve_from<R: RngCore + Send + ?Sized>(
    mut config: Config,
    namespace: &str,
    spec: &SyndesisSpec,
    ctx: &ResolveContext<'_>,
    rng: &mut R,
) -> Result<Resolution> {
    configuration::set_namespace(&mut config, namespace);
    configuration::provision(&mut config, namespace, ctx.secret_store, rng).await?;
    apply_env_overrides(&mut config, ctx.env);
    configuration::apply_custom_resource(&mut config, spec)?;
    apply_external_database(&mut config)?;

    let upgrade = if config.uses_external_database() {
        UpgradeDecision::NoUpgrade
    } else {
        match ctx.database_probe {
            Some(probe) => decide_upgrade(&config, namespace, probe).await,
            None => UpgradeDecision::Undetermined {
                reason: "no cluster access to probe the database".to_string(),
            },
        }
    };
    config.database_needs_upgrade = upgrade.needs_upgrade();

    info!(
        namespace,
        upgrade = %upgrade,
        external_database = config.uses_external_database(),
        "Configuration resolved"
    );
    Ok(Resolution { config, upgrade })
}

/// Read the spec of Syndesis `name` as raw JSON and deserialize it into overrides.
///
/// The object is read untyped so that a malformed spec surfaces as a
/// deserialization error of this resolution rather than as a client error.
#[instrument(skip(client))]
pub async fn fetch_syndesis_spec(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<SyndesisSpec> {
    let api_resource = ApiResource::erase::<Syndesis>(&());
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &api_resource);

    let object = api.get(name).await.map_err(Error::KubeError)?;
    let spec = object
        .data
        .get("spec")
        .cloned()
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    let overrides = configuration::overrides_from_value(spec)?;
    Ok(SyndesisSpec { overrides })
}
