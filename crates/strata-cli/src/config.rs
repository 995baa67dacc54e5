//! Configuration for the `strata` command.
//!
//! [`StrataConfig`] loads from a TOML file, `STRATA_*` environment
//! variables and defaults using the `confyg` crate. The engine tunables live
//! under `[engine]`, unchanged from [`EngineConfig`].
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `STRATA_CONFIG` environment variable
//! 3. XDG default: `~/.config/strata/config.toml`
//! 4. Built-in defaults

use confyg::{Confygery, env};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strata_core::{EngineConfig, Error, Result};

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the `strata` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Default input files.
    pub paths: PathsConfig,

    /// Query engine tunables.
    pub engine: EngineConfig,
}

/// Input files used when a command does not name them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Schema definition (JSON).
    pub schema: Option<String>,

    /// Canned operation responses (JSON).
    pub responses: Option<String>,
}

// ============================================================================
// Config loading
// ============================================================================

impl StrataConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("STRATA");
        env_opts.add_section("paths");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("STRATA_CONFIG") {
            return Some(PathBuf::from(path));
        }
        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("strata").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// The schema file: `explicit` if given, else `paths.schema`.
    pub fn schema_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf> {
        explicit
            .or_else(|| self.paths.schema.as_ref().map(PathBuf::from))
            .ok_or_else(|| Error::config("no schema given; pass --schema or set paths.schema"))
    }

    /// The responses file: `explicit` if given, else `paths.responses`.
    pub fn responses_path(&self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| self.paths.responses.as_ref().map(PathBuf::from))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strata_config_default() {
        let config = StrataConfig::default();
        assert!(config.paths.schema.is_none());
        assert!(config.paths.responses.is_none());
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.search.max_evaluations, 250);
    }

    #[test]
    fn test_strata_config_from_toml() {
        let toml_str = r#"
            [paths]
            schema = "/data/schema.json"

            [engine.cache]
            enabled = false

            [engine.search]
            max_evaluations = 40
        "#;

        let config: StrataConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.paths.schema.as_deref(), Some("/data/schema.json"));
        assert!(!config.engine.cache.enabled);
        assert_eq!(config.engine.cache.evict_when_result_size_exceeds, 10);
        assert_eq!(config.engine.search.max_evaluations, 40);
        assert_eq!(config.engine.context.max_evaluated_edges, 1000);
    }

    #[test]
    fn test_strata_config_to_toml() {
        let config = StrataConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("[engine.cache]"));
        assert!(toml_str.contains("evict_when_result_size_exceeds = 10"));

        let parsed: StrataConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_strata_config_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                [paths]
                responses = "/data/responses.json"
                [engine.profiler]
                enabled = false
            "#,
        )
        .unwrap();

        let config = StrataConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.paths.responses.as_deref(), Some("/data/responses.json"));
        assert!(!config.engine.profiler.enabled);
        assert!(config.engine.cache.enabled);
    }

    #[test]
    fn test_strata_config_load_defaults() {
        let config = StrataConfig::load(Some("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_strata_config_resolve_config_path_explicit() {
        let path = StrataConfig::resolve_config_path(Some("/explicit/config.toml"));
        assert_eq!(path, Some(PathBuf::from("/explicit/config.toml")));
    }

    #[test]
    fn test_strata_config_default_path() {
        if let Some(path) = StrataConfig::default_config_path() {
            assert!(path.ends_with("strata/config.toml"));
        }
    }

    #[test]
    fn test_schema_path_prefers_explicit() {
        let mut config = StrataConfig::default();
        assert!(matches!(config.schema_path(None), Err(Error::Config(_))));

        config.paths.schema = Some("configured.json".into());
        assert_eq!(
            config.schema_path(None).unwrap(),
            PathBuf::from("configured.json")
        );
        assert_eq!(
            config.schema_path(Some("flag.json".into())).unwrap(),
            PathBuf::from("flag.json")
        );
        assert!(config.responses_path(None).is_none());
    }
}
