//! Field-by-field overlay of configuration trees
//!
//! Overrides only replace what they actually set: a non-empty string, a `true`
//! flag, a non-zero number, a non-empty list. Map entries from the override are
//! inserted over the base entries. Anything else leaves the base untouched, so
//! defaults and generated secrets survive an override that does not mention
//! them.

use std::collections::BTreeMap;

use super::types::{
    AddonConfiguration, AddonsSpec, CamelKConfiguration, ComponentsSpec, Config,
    DatabaseConfiguration, DvConfiguration, GrafanaConfiguration, ImageConfiguration,
    JaegerConfiguration, MetaConfiguration, OauthConfiguration, PrometheusConfiguration,
    PublicApiConfiguration, Resources, ResourcesWithPersistentVolume, ResourcesWithVolume,
    ServerConfiguration, ServerFeatures, SyndesisConfig, TodoConfiguration, UpgradeConfiguration,
    VolumeOnlyResources,
};

/// A value that can take set fields from an override of the same shape
pub trait Merge {
    /// Overlay `overrides` onto `self`, keeping every field `overrides` leaves unset
    fn merge_from(&mut self, overrides: &Self);
}

/// Moving version of [`Merge::merge_from`]
pub fn merged<T: Merge>(mut base: T, overrides: &T) -> T {
    base.merge_from(overrides);
    base
}

impl Merge for String {
    fn merge_from(&mut self, overrides: &Self) {
        if !overrides.is_empty() {
            self.clone_from(overrides);
        }
    }
}

impl Merge for bool {
    fn merge_from(&mut self, overrides: &Self) {
        if *overrides {
            *self = true;
        }
    }
}

impl Merge for i32 {
    fn merge_from(&mut self, overrides: &Self) {
        if *overrides != 0 {
            *self = *overrides;
        }
    }
}

impl<T: Clone> Merge for Vec<T> {
    fn merge_from(&mut self, overrides: &Self) {
        if !overrides.is_empty() {
            self.clone_from(overrides);
        }
    }
}

impl<V: Clone> Merge for BTreeMap<String, V> {
    fn merge_from(&mut self, overrides: &Self) {
        for (key, value) in overrides {
            self.insert(key.clone(), value.clone());
        }
    }
}

/// Implements [`Merge`] by merging the listed fields one by one.
///
/// The destructuring pattern makes the list exhaustive: adding a field to a
/// struct without listing it here fails to compile.
macro_rules! merge_fields {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl Merge for $name {
            fn merge_from(&mut self, overrides: &Self) {
                let $name { $($field),* } = overrides;
                $( self.$field.merge_from($field); )*
            }
        }
    };
}

merge_fields!(Config {
    allow_local_host,
    productized,
    version,
    dev_support,
    scheduled,
    product_name,
    prometheus_rules,
    open_shift_project,
    open_shift_oauth_client_secret,
    open_shift_console_url,
    image_pull_secrets,
    database_needs_upgrade,
    syndesis,
});

merge_fields!(SyndesisConfig {
    demo_data,
    sha,
    route_hostname,
    components,
    addons,
});

merge_fields!(ComponentsSpec {
    ui,
    s2i,
    oauth,
    server,
    meta,
    database,
    prometheus,
    grafana,
    upgrade,
    amq,
});

merge_fields!(ImageConfiguration { image });

merge_fields!(OauthConfiguration {
    image,
    cookie_secret,
    disable_sar_check,
    sar_namespace,
});

merge_fields!(DatabaseConfiguration {
    image,
    user,
    name,
    url,
    external_db_url,
    resources,
    exporter,
    password,
    sampledb_password,
});

merge_fields!(PrometheusConfiguration {
    image,
    rules,
    resources,
});

merge_fields!(GrafanaConfiguration { resources });

merge_fields!(ServerConfiguration {
    image,
    resources,
    features,
    syndesis_encrypt_key,
    client_state_authentication_key,
    client_state_encryption_key,
});

merge_fields!(MetaConfiguration { image, resources });

merge_fields!(UpgradeConfiguration { image, resources });

merge_fields!(Resources { memory });

merge_fields!(ResourcesWithVolume {
    memory,
    volume_capacity,
});

merge_fields!(ResourcesWithPersistentVolume {
    memory,
    volume_capacity,
    volume_name,
    volume_access_mode,
    volume_storage_class,
    volume_labels,
});

merge_fields!(VolumeOnlyResources { volume_capacity });

merge_fields!(ServerFeatures {
    integration_limit,
    integration_state_check_interval,
    deploy_integrations,
    test_support,
    open_shift_master,
    management_url_for_3scale,
    maven_repositories,
});

merge_fields!(AddonsSpec {
    jaeger,
    ops,
    todo,
    knative,
    dv,
    camelk,
    public_api,
});

merge_fields!(JaegerConfiguration {
    enabled,
    client_only,
    operator_only,
    query_uri,
    collector_uri,
    sampler_type,
    sampler_param,
    image_agent,
    image_all_in_one,
    image_operator,
});

merge_fields!(AddonConfiguration { enabled });

merge_fields!(TodoConfiguration { image, enabled });

merge_fields!(DvConfiguration {
    image,
    enabled,
    resources,
});

merge_fields!(CamelKConfiguration {
    image,
    enabled,
    camel_version,
    camel_k_runtime,
});

merge_fields!(PublicApiConfiguration {
    enabled,
    route_hostname,
    disable_sar_check,
});
