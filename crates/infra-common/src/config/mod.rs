//! TOML configuration loading.
//!
//! Configuration structs live next to the code they configure and derive
//! `serde::Deserialize`; this module only turns text or files into them.

use crate::errors::types::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse `text` as TOML into `T`
pub fn load_toml_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
}

/// Read and parse the TOML file at `path`
pub fn load_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loaded configuration file");
    load_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        retries: u32,
    }

    #[test]
    fn test_load_from_str() {
        let parsed: Sample = load_toml_str("name = \"edge\"\nretries = 3\n").unwrap();
        assert_eq!(parsed, Sample { name: "edge".into(), retries: 3 });
    }

    #[test]
    fn test_defaults_apply() {
        let parsed: Sample = load_toml_str("name = \"core\"").unwrap();
        assert_eq!(parsed.retries, 0);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = load_toml_str::<Sample>("name = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_toml_file::<Sample>("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
