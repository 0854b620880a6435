//! Settings loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::EntrypointSettings;
use crate::env::EnvironmentView;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit settings file location.
pub const SETTINGS_PATH_VAR: &str = "CONFLUENCE_ENTRYPOINT_CONFIG";

/// Settings tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// YAML settings file
    File = 1,
    /// Environment variables
    Environment = 2,
    /// Command-line flags (highest priority, applied by the binary)
    Cli = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::File => write!(f, "file"),
            ConfigTier::Environment => write!(f, "environment"),
            ConfigTier::Cli => write!(f, "cli"),
        }
    }
}

/// Environment variables that map onto settings fields.
const PATH_VARS: &[(&str, &str)] = &[
    ("CONFLUENCE_INSTALL_DIR", "install_dir"),
    ("CONFLUENCE_HOME", "home_dir"),
    ("RUN_USER", "run_user"),
    ("RUN_GROUP", "run_group"),
];

const ID_VARS: &[(&str, &str)] = &[("RUN_UID", "run_uid"), ("RUN_GID", "run_gid")];

/// Loads [`EntrypointSettings`] from defaults, an optional file and the
/// environment snapshot.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    settings: EntrypointSettings,
    settings_path: Option<PathBuf>,
}

impl SettingsLoader {
    /// Load all tiers. `explicit` wins over `CONFLUENCE_ENTRYPOINT_CONFIG`.
    pub fn load(env: &EnvironmentView, explicit: Option<&Path>) -> Result<Self> {
        let settings_path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.get(SETTINGS_PATH_VAR).map(PathBuf::from));

        let mut tiers: Vec<Value> = Vec::new();

        // Tier 1: Defaults
        tiers.push(serde_json::to_value(EntrypointSettings::default())?);

        // Tier 2: Settings file. An explicitly named file must exist.
        if let Some(ref path) = settings_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            let yaml_value: Value = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", path.display()))?;
            debug!(tier = %ConfigTier::File, path = %path.display(), "Loaded settings");
            tiers.push(yaml_value);
        }

        // Tier 3: Environment
        tiers.push(Self::env_overrides(env)?);

        let merged = deep_merge_all(tiers);
        let settings: EntrypointSettings =
            serde_json::from_value(merged).context("Invalid entrypoint settings")?;

        Ok(Self {
            settings,
            settings_path,
        })
    }

    /// Settings fields supplied by the environment.
    fn env_overrides(env: &EnvironmentView) -> Result<Value> {
        let mut map = Map::new();

        for (var, key) in PATH_VARS {
            if let Some(value) = env.get(var) {
                map.insert((*key).to_string(), Value::String(value.to_string()));
            }
        }

        for (var, key) in ID_VARS {
            if let Some(value) = env.get(var) {
                let Ok(id) = value.trim().parse::<u32>() else {
                    bail!("{} must be a numeric id, got {:?}", var, value);
                };
                map.insert((*key).to_string(), Value::from(id));
            }
        }

        if !map.is_empty() {
            debug!(tier = %ConfigTier::Environment, keys = map.len(), "Applied settings overrides");
        }
        Ok(Value::Object(map))
    }

    pub fn settings(&self) -> &EntrypointSettings {
        &self.settings
    }

    /// Mutable access for CLI overrides.
    pub fn settings_mut(&mut self) -> &mut EntrypointSettings {
        &mut self.settings
    }

    pub fn into_settings(self) -> EntrypointSettings {
        self.settings
    }

    /// The settings file that was read, if any.
    pub fn settings_path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_only() {
        let loader = SettingsLoader::load(&EnvironmentView::default(), None).unwrap();
        assert_eq!(loader.settings(), &EntrypointSettings::default());
        assert!(loader.settings_path().is_none());
    }

    #[test]
    fn test_env_beats_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("entrypoint.yaml");
        fs::write(&file, "home_dir: /from-file\ninstall_dir: /opt/app\nkeep_env: [MY_VAR]\n")
            .unwrap();

        let env = EnvironmentView::from_pairs([
            ("CONFLUENCE_HOME", "/from-env"),
            ("CONFLUENCE_ENTRYPOINT_CONFIG", file.to_str().unwrap()),
        ]);
        let loader = SettingsLoader::load(&env, None).unwrap();
        let settings = loader.settings();
        assert_eq!(settings.home_dir, PathBuf::from("/from-env"));
        assert_eq!(settings.install_dir, PathBuf::from("/opt/app"));
        assert_eq!(settings.keep_env, vec!["MY_VAR"]);
        assert_eq!(loader.settings_path(), Some(file.as_path()));
    }

    #[test]
    fn test_numeric_ids() {
        let env = EnvironmentView::from_pairs([("RUN_UID", "2002"), ("RUN_GID", "2003")]);
        let settings = SettingsLoader::load(&env, None).unwrap().into_settings();
        assert_eq!(settings.ownership(), Some((Some(2002), Some(2003))));
    }

    #[test]
    fn test_non_numeric_id_rejected() {
        let env = EnvironmentView::from_pairs([("RUN_UID", "confluence")]);
        let err = SettingsLoader::load(&env, None).unwrap_err();
        assert!(err.to_string().contains("RUN_UID"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(SettingsLoader::load(&EnvironmentView::default(), Some(&missing)).is_err());
    }

    #[test]
    fn test_tier_order() {
        assert!(ConfigTier::Defaults < ConfigTier::File);
        assert!(ConfigTier::Environment < ConfigTier::Cli);
        assert_eq!(ConfigTier::Environment.to_string(), "environment");
    }
}
