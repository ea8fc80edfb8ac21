//! Runtime settings.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file,
//! then `CHAIN_PROTO__*` environment variables (`__` separates nested keys,
//! e.g. `CHAIN_PROTO__CODEC__PRESERVE_UNKNOWN_FIELDS=false`).

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "CHAIN_PROTO";

/// Codec behavior switches.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Keep fields with unknown tags on decode and write them back on encode.
    #[serde(default = "default_preserve_unknown_fields")]
    pub preserve_unknown_fields: bool,
}

fn default_preserve_unknown_fields() -> bool {
    true
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            preserve_unknown_fields: default_preserve_unknown_fields(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// One of trace, debug, info, warn, error.
    pub log_level: String,
    /// JSON tag table to use instead of the built-in one.
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub codec: CodecConfig,
}

impl Settings {
    /// Loads settings from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Parses settings from TOML text on top of the defaults, ignoring the
    /// environment.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("log_level", "info")?
            .set_default(
                "codec.preserve_unknown_fields",
                default_preserve_unknown_fields(),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.schema_path, None);
        assert!(settings.codec.preserve_unknown_fields);
    }

    #[test]
    fn file_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            log_level = "debug"
            schema_path = "tables/chain.json"

            [codec]
            preserve_unknown_fields = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.schema_path, Some(PathBuf::from("tables/chain.json")));
        assert!(!settings.codec.preserve_unknown_fields);
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir()
            .join(format!("chain-proto-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/chain-proto.toml");
        assert!(Settings::load(Some(path)).is_err());
    }
}
