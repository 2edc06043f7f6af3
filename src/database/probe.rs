//! Read-only probes of the managed PostgreSQL instance
//!
//! Three facts feed the upgrade decision: the containers of the running
//! database DeploymentConfig, the version of the running server, and the
//! version banner printed by the operator's `postgres-version` init container
//! (the version the next rollout will run). Every probe is bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;
use futures::AsyncReadExt;
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::api::{DynamicObject, LogParams};
use kube::discovery::ApiResource;
use kube::{Api, Client};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Name of the managed database DeploymentConfig and of its service
pub const DATABASE_DEPLOYMENT: &str = "syndesis-db";
/// Name of the database engine container in that deployment
pub const DATABASE_CONTAINER: &str = "postgresql";
/// Init container of the operator pod printing the target PostgreSQL version
pub const VERSION_INIT_CONTAINER: &str = "postgres-version";

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on the bytes read from the version log
const VERSION_LOG_LIMIT_BYTES: i64 = 4096;

/// DeploymentConfig API resource for apps.openshift.io/v1
fn deployment_config_api_resource() -> ApiResource {
    ApiResource {
        group: "apps.openshift.io".to_string(),
        version: "v1".to_string(),
        api_version: "apps.openshift.io/v1".to_string(),
        kind: "DeploymentConfig".to_string(),
        plural: "deploymentconfigs".to_string(),
    }
}

/// Containers of the pod template of a DeploymentConfig object
pub fn deployment_config_containers(object: &DynamicObject) -> Result<Option<Vec<Container>>> {
    let Some(containers) = object.data.pointer("/spec/template/spec/containers") else {
        return Ok(None);
    };
    let containers = serde_json::from_value(containers.clone()).map_err(|e| {
        Error::VersionProbeError(format!("malformed DeploymentConfig containers: {e}"))
    })?;
    Ok(Some(containers))
}

/// Connection parameters of the managed database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionParams {
    /// Parameters of the in-cluster `syndesis-db` service
    pub fn managed(user: &str, password: &str, database: &str) -> Self {
        Self {
            host: DATABASE_DEPLOYMENT.to_string(),
            port: 5432,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        }
    }
}

/// Read-only view of the managed database used by the upgrade decider
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// Containers of the running database DeploymentConfig, `None` when it does not exist
    async fn database_containers(&self, namespace: &str) -> Result<Option<Vec<Container>>>;

    /// Version of the running database server, as a `PostgreSQL <version>` banner
    async fn current_version(&self, params: &ConnectionParams) -> Result<String>;

    /// Version banner of the PostgreSQL release the next rollout will run
    async fn target_version(&self, namespace: &str) -> Result<String>;
}

/// [`DatabaseProbe`] talking to the cluster and to the database itself
#[derive(Clone)]
pub struct ClusterDatabaseProbe {
    client: Client,
    operator_pod: String,
    timeout: Duration,
}

impl ClusterDatabaseProbe {
    /// `operator_pod` is the pod whose `postgres-version` init container log is read
    pub fn new(client: Client, operator_pod: impl Into<String>) -> Self {
        Self {
            client,
            operator_pod: operator_pod.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                Error::VersionProbeError(format!("{} timed out after {:?}", what, self.timeout))
            })?
    }
}

#[async_trait]
impl DatabaseProbe for ClusterDatabaseProbe {
    #[instrument(skip(self))]
    async fn database_containers(&self, namespace: &str) -> Result<Option<Vec<Container>>> {
        let api_resource = deployment_config_api_resource();
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &api_resource);

        match api.get_opt(DATABASE_DEPLOYMENT).await {
            Ok(Some(object)) => deployment_config_containers(&object),
            Ok(None) => {
                debug!("DeploymentConfig {}/{} not found", namespace, DATABASE_DEPLOYMENT);
                Ok(None)
            }
            Err(e) => Err(Error::KubeError(e)),
        }
    }

    #[instrument(skip(self, params), fields(host = %params.host, database = %params.database))]
    async fn current_version(&self, params: &ConnectionParams) -> Result<String> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database);

        self.bounded("PostgreSQL version query", async {
            let mut conn = PgConnection::connect_with(&options)
                .await
                .map_err(|e| Error::VersionProbeError(e.to_string()))?;
            // server_version holds only the release, e.g. `10.6 (Debian 10.6-1.pgdg90+1)`
            let version = sqlx::query_scalar::<_, String>("SHOW server_version")
                .fetch_one(&mut conn)
                .await;
            if let Err(e) = conn.close().await {
                debug!("Failed to close PostgreSQL connection: {}", e);
            }

            let version = version.map_err(|e| Error::VersionProbeError(e.to_string()))?;
            let banner = format!("PostgreSQL {version}");
            debug!(banner = %banner, "Read running PostgreSQL version");
            Ok::<_, Error>(banner)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn target_version(&self, namespace: &str) -> Result<String> {
        if self.operator_pod.is_empty() {
            return Err(Error::VersionProbeError(
                "operator pod name is unknown (POD_NAME not set)".to_string(),
            ));
        }

        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(VERSION_INIT_CONTAINER.to_string()),
            limit_bytes: Some(VERSION_LOG_LIMIT_BYTES),
            ..Default::default()
        };

        self.bounded("PostgreSQL target version log read", async {
            let stream = api
                .log_stream(&self.operator_pod, &params)
                .await
                .map_err(|e| Error::VersionProbeError(e.to_string()))?;
            futures::pin_mut!(stream);

            let mut banner = String::new();
            stream
                .read_to_string(&mut banner)
                .await
                .map_err(|e| Error::VersionProbeError(e.to_string()))?;
            debug!(banner = %banner.trim(), "Read target PostgreSQL version");
            Ok::<_, Error>(banner)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment_config(data: serde_json::Value) -> DynamicObject {
        DynamicObject::new(DATABASE_DEPLOYMENT, &deployment_config_api_resource()).data(data)
    }

    #[test]
    fn test_deployment_config_containers() {
        let object = deployment_config(serde_json::json!({
            "spec": { "template": { "spec": { "containers": [{
                "name": "postgresql",
                "image": "postgresql:9.6",
                "env": [{ "name": "POSTGRESQL_UPGRADE", "value": "true" }]
            }]}}}
        }));

        let containers = deployment_config_containers(&object).unwrap().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, DATABASE_CONTAINER);
        let env = containers[0].env.as_ref().unwrap();
        assert_eq!(env[0].name, "POSTGRESQL_UPGRADE");
    }

    #[test]
    fn test_deployment_config_without_template() {
        let object = deployment_config(serde_json::json!({ "spec": { "replicas": 1 } }));
        assert_eq!(deployment_config_containers(&object).unwrap(), None);

        let malformed = deployment_config(serde_json::json!({
            "spec": { "template": { "spec": { "containers": "postgresql" } } }
        }));
        assert!(matches!(
            deployment_config_containers(&malformed),
            Err(Error::VersionProbeError(_))
        ));
    }

    #[test]
    fn test_deployment_config_api_resource() {
        let resource = deployment_config_api_resource();
        assert_eq!(resource.api_version, "apps.openshift.io/v1");
        assert_eq!(resource.plural, "deploymentconfigs");
    }

    #[test]
    fn test_managed_connection_params() {
        let params = ConnectionParams::managed("syndesis", "secret", "syndesis");
        assert_eq!(params.host, "syndesis-db");
        assert_eq!(params.port, 5432);
        assert_eq!(params.user, "syndesis");
        assert_eq!(params.database, "syndesis");
    }
}
