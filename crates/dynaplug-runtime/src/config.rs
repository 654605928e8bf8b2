//! Runtime configuration
//!
//! Loaded from YAML, TOML or JSON. `${VAR}` and `${VAR:-default}` are
//! expanded before parsing, and `DYNAPLUG_PLUGIN_DIR` overrides the plugin
//! directory after parsing.

use crate::descriptor::METADATA_FILE_NAME;
use crate::error::{PluginRuntimeError, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`RuntimeConfig::plugin_dir`]
pub const PLUGIN_DIR_ENV: &str = "DYNAPLUG_PLUGIN_DIR";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Base directory holding one subdirectory per plugin
    pub plugin_dir: PathBuf,

    /// Metadata file name inside each plugin directory
    pub metadata_file: String,

    /// Plugin the driver runs
    pub plugin: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            metadata_file: METADATA_FILE_NAME.to_string(),
            plugin: "sample".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Plugin directory made absolute against the current directory
    pub fn resolved_plugin_dir(&self) -> Result<PathBuf> {
        if self.plugin_dir.is_absolute() {
            Ok(self.plugin_dir.clone())
        } else {
            Ok(env::current_dir()?.join(&self.plugin_dir))
        }
    }

    /// Apply environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var(PLUGIN_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.plugin_dir = PathBuf::from(dir);
            }
        }
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(PluginRuntimeError::config("plugin_dir cannot be empty"));
        }

        if self.metadata_file.trim().is_empty() {
            return Err(PluginRuntimeError::config("metadata_file cannot be empty"));
        }

        if self.metadata_file.contains(['/', '\\']) {
            return Err(PluginRuntimeError::config(format!(
                "metadata_file must be a file name, got '{}'",
                self.metadata_file
            )));
        }

        Ok(())
    }
}

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PluginRuntimeError::config("Unable to detect config format"))?;

        match ext {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(PluginRuntimeError::config(format!(
                "Unsupported config format: {ext}"
            ))),
        }
    }
}

/// Load configuration from a file, apply overrides and validate it
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RuntimeConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        PluginRuntimeError::config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    let mut config = load_from_str(&content, ConfigFormat::from_path(path)?)?;
    config.apply_env_overrides();
    config.validate()?;

    Ok(config)
}

/// Parse configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RuntimeConfig> {
    let expanded = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded)
            .map_err(|e| PluginRuntimeError::config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded)
            .map_err(|e| PluginRuntimeError::config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded)
            .map_err(|e| PluginRuntimeError::config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Expand `${VAR}` and `${VAR:-default}`
///
/// A variable that is unset and has no default is an error naming it.
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .map_err(|e| PluginRuntimeError::config(format!("Invalid regex: {e}")))?;

    let mut unset = None;
    let expanded = re.replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        env::var(name)
            .ok()
            .or_else(|| caps.get(2).map(|default| default.as_str().to_string()))
            .unwrap_or_else(|| {
                unset.get_or_insert_with(|| name.to_string());
                String::new()
            })
    });

    match unset {
        Some(name) => Err(PluginRuntimeError::config(format!(
            "Environment variable '{name}' not set and no default provided"
        ))),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.plugin_dir, PathBuf::from("plugins"));
        assert_eq!(config.metadata_file, "plugin.json");
        assert_eq!(config.plugin, "sample");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_detect_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("dynaplug.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("dynaplug.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("dynaplug.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("dynaplug.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("dynaplug")).is_err());
    }

    #[test]
    fn test_load_yaml() {
        let config = load_from_str(
            "plugin_dir: /opt/plugins\nplugin: greeter\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("/opt/plugins"));
        assert_eq!(config.plugin, "greeter");
        assert_eq!(config.metadata_file, "plugin.json");
    }

    #[test]
    fn test_load_toml() {
        let config = load_from_str(
            "plugin_dir = \"/opt/plugins\"\nmetadata_file = \"meta.json\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.metadata_file, "meta.json");
    }

    #[test]
    fn test_load_invalid_json() {
        let err = load_from_str("{", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, PluginRuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_env_var_default() {
        let config = load_from_str(
            "plugin_dir: ${DYNAPLUG_TEST_UNSET_DIR:-/fallback}\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.plugin_dir, PathBuf::from("/fallback"));
    }

    #[test]
    fn test_env_var_missing_without_default() {
        let err = load_from_str(
            "plugin_dir: ${DYNAPLUG_TEST_UNSET_NO_DEFAULT}\n",
            ConfigFormat::Yaml,
        )
        .unwrap_err();
        assert!(matches!(err, PluginRuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_env_var_expansion_keeps_surrounding_text() {
        let expanded =
            expand_env_vars("a: ${DYNAPLUG_TEST_UNSET_A:-x}/${DYNAPLUG_TEST_UNSET_B:-}/z").unwrap();
        assert_eq!(expanded, "a: x//z");
        assert_eq!(expand_env_vars("no vars").unwrap(), "no vars");
    }

    #[test]
    fn test_validate_rejects_metadata_path() {
        let config = RuntimeConfig {
            metadata_file: "nested/plugin.json".to_string(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"plugin_dir": "/srv/plugins", "plugin": "sample"}}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.plugin, "sample");
    }

    #[test]
    fn test_load_config_missing_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("yaml");
        assert!(load_config(path).is_err());
    }
}
