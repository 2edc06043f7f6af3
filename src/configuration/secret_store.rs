//! Access to the persisted secret bundle of an installation
//!
//! The bundle lives in a Kubernetes Secret with a fixed name in the
//! installation namespace. An absent Secret is a normal first-run condition and
//! is reported as `Ok(None)`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Name of the Secret holding generated passwords and keys
pub const SYNDESIS_GLOBAL_CONFIG_SECRET: &str = "syndesis-global-config";

/// Raw secret bundle: field name to decoded value
pub type BundleData = BTreeMap<String, String>;

/// Read access to a named secret bundle
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch bundle `name` in `namespace`, `None` when it does not exist
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<BundleData>>;
}

/// [`SecretStore`] backed by Kubernetes Secrets
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    #[instrument(skip(self))]
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<BundleData>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let bundle = bundle_from_lookup(api.get(name).await)?;
        if bundle.is_none() {
            debug!("Secret {}/{} not found", namespace, name);
        }
        Ok(bundle)
    }
}

/// Map a Secret lookup to a bundle: "not found" is `None`, any other failure
/// is a `SecretStoreError`
pub fn bundle_from_lookup(lookup: Result<Secret, kube::Error>) -> Result<Option<BundleData>> {
    match lookup {
        Ok(secret) => Ok(Some(secret_to_bundle(&secret))),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(Error::SecretStoreError(e)),
    }
}

/// Decode `data` and `stringData` of a Secret into one map
pub fn secret_to_bundle(secret: &Secret) -> BundleData {
    let mut bundle = BundleData::new();
    if let Some(data) = &secret.data {
        for (key, value) in data {
            bundle.insert(key.clone(), String::from_utf8_lossy(&value.0).into_owned());
        }
    }
    if let Some(string_data) = &secret.string_data {
        bundle.extend(string_data.clone());
    }
    bundle
}

/// [`SecretStore`] over bundles held in memory, keyed by `(name, namespace)`
#[derive(Clone, Debug, Default)]
pub struct StaticSecretStore {
    bundles: BTreeMap<(String, String), BundleData>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, name: &str, namespace: &str, data: BundleData) -> Self {
        self.bundles
            .insert((name.to_string(), namespace.to_string()), data);
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<BundleData>> {
        Ok(self
            .bundles
            .get(&(name.to_string(), namespace.to_string()))
            .cloned())
    }
}
