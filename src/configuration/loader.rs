//! Loading of the packaged default configuration document
//!
//! The document may be YAML or JSON. Both are parsed into a `serde_json::Value`
//! first and only then deserialized into [`Config`], so structural errors are
//! reported the same way whatever the source format was.

use std::path::Path;

use tracing::debug;

use super::types::Config;
use crate::error::{Error, Result};

/// Read and deserialize the default configuration document at `path`
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let data = std::fs::read(path).map_err(|e| Error::load(&shown, e))?;
    let config = load_from_slice(&data).map_err(|e| match e {
        Error::LoadError { message, .. } => Error::load(&shown, message),
        other => other,
    })?;

    debug!(path = %shown, "Loaded default configuration");
    Ok(config)
}

/// Deserialize a default configuration document held in memory
pub fn load_from_slice(data: &[u8]) -> Result<Config> {
    let document = normalize(data)?;
    serde_json::from_value(document).map_err(|e| Error::load("<memory>", e))
}

/// Parse YAML or JSON into the canonical JSON representation.
///
/// JSON is tried first so that JSON-only constructs keep their exact meaning;
/// everything else goes through the YAML parser, which also accepts JSON.
fn normalize(data: &[u8]) -> Result<serde_json::Value> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        return Ok(value);
    }

    let yaml: serde_yaml::Value =
        serde_yaml::from_slice(data).map_err(|e| Error::load("<memory>", e))?;
    let value = match yaml {
        serde_yaml::Value::Null => serde_json::Value::Object(Default::default()),
        other => serde_json::to_value(other).map_err(|e| Error::load("<memory>", e))?,
    };

    if !value.is_object() {
        return Err(Error::load(
            "<memory>",
            "default configuration must be a mapping at the top level",
        ));
    }
    Ok(value)
}
