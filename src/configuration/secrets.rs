//! Provisioning of generated passwords and keys
//!
//! Secret slots are first filled from the persisted bundle, then whatever is
//! still empty is generated. A slot that already holds a value is never
//! regenerated, which keeps repeated resolutions stable.

use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use tracing::{debug, info, instrument, warn};

use super::secret_store::{BundleData, SecretStore, SYNDESIS_GLOBAL_CONFIG_SECRET};
use super::types::Config;
use crate::error::Result;

pub const OPENSHIFT_OAUTH_CLIENT_SECRET: &str = "OPENSHIFT_OAUTH_CLIENT_SECRET";
pub const POSTGRESQL_PASSWORD: &str = "POSTGRESQL_PASSWORD";
pub const POSTGRESQL_SAMPLEDB_PASSWORD: &str = "POSTGRESQL_SAMPLEDB_PASSWORD";
pub const OAUTH_COOKIE_SECRET: &str = "OAUTH_COOKIE_SECRET";
pub const SYNDESIS_ENCRYPT_KEY: &str = "SYNDESIS_ENCRYPT_KEY";
pub const CLIENT_STATE_AUTHENTICATION_KEY: &str = "CLIENT_STATE_AUTHENTICATION_KEY";
pub const CLIENT_STATE_ENCRYPTION_KEY: &str = "CLIENT_STATE_ENCRYPTION_KEY";

/// Field of the legacy layout holding newline separated `KEY=VALUE` pairs
pub const LEGACY_PARAMS: &str = "params";

/// Every secret field, in the order they are provisioned
pub const SECRET_FIELDS: [&str; 7] = [
    OPENSHIFT_OAUTH_CLIENT_SECRET,
    POSTGRESQL_PASSWORD,
    POSTGRESQL_SAMPLEDB_PASSWORD,
    OAUTH_COOKIE_SECRET,
    SYNDESIS_ENCRYPT_KEY,
    CLIENT_STATE_AUTHENTICATION_KEY,
    CLIENT_STATE_ENCRYPTION_KEY,
];

/// Generated length of a secret field
pub fn generated_length(field: &str) -> usize {
    match field {
        OPENSHIFT_OAUTH_CLIENT_SECRET | SYNDESIS_ENCRYPT_KEY => 64,
        POSTGRESQL_PASSWORD | POSTGRESQL_SAMPLEDB_PASSWORD => 16,
        _ => 32,
    }
}

/// The persisted bundle, by layout
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecretBundle {
    /// One Secret field per value
    Canonical(BundleData),
    /// Values parsed from the legacy `params` blob
    LegacyBlob(BundleData),
    /// No bundle, or a bundle with neither layout
    Absent,
}

impl SecretBundle {
    /// Classify raw Secret data.
    ///
    /// The canonical layout wins as soon as any known secret field is present;
    /// the legacy blob is only consulted when none is.
    pub fn from_data(data: Option<BundleData>) -> Self {
        let Some(data) = data else {
            return SecretBundle::Absent;
        };

        if SECRET_FIELDS.iter().any(|field| data.contains_key(*field)) {
            if data.contains_key(LEGACY_PARAMS) {
                debug!("Secret bundle carries both layouts, ignoring legacy params");
            }
            return SecretBundle::Canonical(data);
        }

        match data.get(LEGACY_PARAMS) {
            Some(blob) => {
                info!("Reading secrets from legacy params layout");
                SecretBundle::LegacyBlob(parse_params_blob(blob))
            }
            None => {
                warn!("Secret bundle holds no known layout, secrets will be generated");
                SecretBundle::Absent
            }
        }
    }

    /// Value of `field`, if the bundle holds one
    pub fn get(&self, field: &str) -> Option<&str> {
        match self {
            SecretBundle::Canonical(data) | SecretBundle::LegacyBlob(data) => {
                data.get(field).map(String::as_str)
            }
            SecretBundle::Absent => None,
        }
    }
}

/// Parse the legacy `params` blob.
///
/// Lines are trimmed and split on the first `=`; blank lines and lines without
/// `=` are skipped.
pub fn parse_params_blob(blob: &str) -> BundleData {
    blob.split('\n')
        .map(|line| line.trim_matches(|c| c == ' ' || c == '\r' || c == '\t'))
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Random string of `len` characters drawn uniformly from `[a-zA-Z0-9]`
pub fn generate_password<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Mutable access to the slot of `field` in the configuration tree
fn secret_slot<'a>(config: &'a mut Config, field: &str) -> Option<&'a mut String> {
    let components = &mut config.syndesis.components;
    let slot = match field {
        OPENSHIFT_OAUTH_CLIENT_SECRET => &mut config.open_shift_oauth_client_secret,
        POSTGRESQL_PASSWORD => &mut components.database.password,
        POSTGRESQL_SAMPLEDB_PASSWORD => &mut components.database.sampledb_password,
        OAUTH_COOKIE_SECRET => &mut components.oauth.cookie_secret,
        SYNDESIS_ENCRYPT_KEY => &mut components.server.syndesis_encrypt_key,
        CLIENT_STATE_AUTHENTICATION_KEY => &mut components.server.client_state_authentication_key,
        CLIENT_STATE_ENCRYPTION_KEY => &mut components.server.client_state_encryption_key,
        _ => return None,
    };
    Some(slot)
}

/// Copy persisted values into `config`.
///
/// A persisted value replaces whatever the slot holds: it is the value the
/// running components were deployed with. Empty persisted entries count as unset.
pub fn apply_bundle(config: &mut Config, bundle: &SecretBundle) {
    for field in SECRET_FIELDS {
        let (Some(value), Some(slot)) = (bundle.get(field), secret_slot(config, field)) else {
            continue;
        };
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }
}

/// Generate every secret slot that is still empty
pub fn generate_missing<R: RngCore + ?Sized>(config: &mut Config, rng: &mut R) {
    for field in SECRET_FIELDS {
        if let Some(slot) = secret_slot(config, field) {
            if slot.is_empty() {
                debug!(field, "Generating secret");
                *slot = generate_password(rng, generated_length(field));
            }
        }
    }
}

/// Fill the secret slots of `config` from the persisted bundle in `namespace`,
/// generating the ones the bundle does not provide.
///
/// Without a store every empty slot is generated. Store failures other than
/// "not found" abort provisioning.
#[instrument(skip(config, store, rng))]
pub async fn provision<R: RngCore + Send + ?Sized>(
    config: &mut Config,
    namespace: &str,
    store: Option<&dyn SecretStore>,
    rng: &mut R,
) -> Result<()> {
    let data = match store {
        Some(store) => store.fetch(SYNDESIS_GLOBAL_CONFIG_SECRET, namespace).await?,
        None => None,
    };

    let bundle = SecretBundle::from_data(data);
    apply_bundle(config, &bundle);
    generate_missing(config, rng);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bundle(pairs: &[(&str, &str)]) -> BundleData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_params_blob() {
        let parsed = parse_params_blob(
            "POSTGRESQL_PASSWORD=abc123\r\n  OAUTH_COOKIE_SECRET=xyz=tail \n\nNOEQUALS\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["POSTGRESQL_PASSWORD"], "abc123");
        assert_eq!(parsed["OAUTH_COOKIE_SECRET"], "xyz=tail");
    }

    #[test]
    fn test_bundle_layout_detection() {
        assert_eq!(SecretBundle::from_data(None), SecretBundle::Absent);
        assert_eq!(
            SecretBundle::from_data(Some(bundle(&[("unrelated", "1")]))),
            SecretBundle::Absent
        );

        let canonical =
            SecretBundle::from_data(Some(bundle(&[(OAUTH_COOKIE_SECRET, "c"), ("params", "")])));
        assert!(matches!(canonical, SecretBundle::Canonical(_)));

        let legacy = SecretBundle::from_data(Some(bundle(&[(
            "params",
            "POSTGRESQL_PASSWORD=abc123\nOAUTH_COOKIE_SECRET=xyz\n",
        )])));
        assert_eq!(legacy.get(POSTGRESQL_PASSWORD), Some("abc123"));
        assert_eq!(legacy.get(OAUTH_COOKIE_SECRET), Some("xyz"));
    }

    #[test]
    fn test_generated_lengths() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut config = Config::default();
        generate_missing(&mut config, &mut rng);

        let components = &config.syndesis.components;
        assert_eq!(config.open_shift_oauth_client_secret.len(), 64);
        assert_eq!(components.database.password.len(), 16);
        assert_eq!(components.database.sampledb_password.len(), 16);
        assert_eq!(components.oauth.cookie_secret.len(), 32);
        assert_eq!(components.server.syndesis_encrypt_key.len(), 64);
        assert_eq!(components.server.client_state_authentication_key.len(), 32);
        assert_eq!(components.server.client_state_encryption_key.len(), 32);
        assert!(components
            .database
            .password
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_present_values_are_not_regenerated() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut config = Config::default();
        config.syndesis.components.database.password = "keep-me".to_string();

        generate_missing(&mut config, &mut rng);
        assert_eq!(config.syndesis.components.database.password, "keep-me");
    }

    #[test]
    fn test_persisted_value_replaces_template_value() {
        let mut config = Config::default();
        config.syndesis.components.database.password = "from-template".to_string();
        config.syndesis.components.oauth.cookie_secret = "from-template".to_string();

        apply_bundle(
            &mut config,
            &SecretBundle::Canonical(bundle(&[
                (POSTGRESQL_PASSWORD, "persisted"),
                (OAUTH_COOKIE_SECRET, ""),
                (SYNDESIS_ENCRYPT_KEY, "key"),
            ])),
        );
        let components = &config.syndesis.components;
        assert_eq!(components.database.password, "persisted");
        assert_eq!(components.oauth.cookie_secret, "from-template");
        assert_eq!(components.server.syndesis_encrypt_key, "key");
    }

    #[tokio::test]
    async fn test_provision_prefers_persisted_bundle() {
        use crate::configuration::secret_store::StaticSecretStore;

        let store = StaticSecretStore::new().with_bundle(
            SYNDESIS_GLOBAL_CONFIG_SECRET,
            "syndesis",
            bundle(&[(POSTGRESQL_PASSWORD, "persisted")]),
        );
        let mut config = Config::default();
        config.syndesis.components.database.password = "from-template".to_string();

        provision(&mut config, "syndesis", Some(&store), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        assert_eq!(config.syndesis.components.database.password, "persisted");
        assert_eq!(config.syndesis.components.database.sampledb_password.len(), 16);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = generate_password(&mut StdRng::seed_from_u64(42), 32);
        let b = generate_password(&mut StdRng::seed_from_u64(42), 32);
        assert_eq!(a, b);
    }
}
