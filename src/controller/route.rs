//! External route hostname of the installation

use kube::api::{Api, DynamicObject};
use kube::discovery::ApiResource;
use kube::Client;
use tracing::{debug, instrument};

use crate::configuration::env::ROUTE_HOSTNAME;
use crate::configuration::{Config, EnvSource};
use crate::error::{Error, Result};

/// Name of the OpenShift Route exposing the UI
pub const SYNDESIS_ROUTE: &str = "syndesis";

/// Route API resource for route.openshift.io/v1
fn route_api_resource() -> ApiResource {
    ApiResource {
        group: "route.openshift.io".to_string(),
        version: "v1".to_string(),
        api_version: "route.openshift.io/v1".to_string(),
        kind: "Route".to_string(),
        plural: "routes".to_string(),
    }
}

/// Host declared in a Route object
pub fn route_host(route: &DynamicObject) -> Option<String> {
    route
        .data
        .get("spec")
        .and_then(|spec| spec.get("host"))
        .and_then(|host| host.as_str())
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Set `routeHostname` from `ROUTE_HOSTNAME`, or from the `syndesis` Route.
///
/// A missing Route leaves the hostname unchanged.
#[instrument(skip(config, client, env))]
pub async fn set_route(
    config: &mut Config,
    client: &Client,
    namespace: &str,
    env: &dyn EnvSource,
) -> Result<()> {
    if let Some(hostname) = env.get(ROUTE_HOSTNAME) {
        config.syndesis.route_hostname = hostname;
        return Ok(());
    }

    let api_resource = route_api_resource();
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, &api_resource);

    match api.get(SYNDESIS_ROUTE).await {
        Ok(route) => {
            if let Some(host) = route_host(&route) {
                config.syndesis.route_hostname = host;
            }
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!("Route {}/{} not found", namespace, SYNDESIS_ROUTE);
            Ok(())
        }
        Err(e) => Err(Error::KubeError(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_host() {
        let route = DynamicObject::new("syndesis", &route_api_resource()).data(serde_json::json!({
            "spec": { "host": "syndesis.apps.example.com" }
        }));
        assert_eq!(
            route_host(&route).as_deref(),
            Some("syndesis.apps.example.com")
        );

        let empty = DynamicObject::new("syndesis", &route_api_resource());
        assert_eq!(route_host(&empty), None);
    }
}
