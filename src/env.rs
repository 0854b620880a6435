//! Immutable snapshot of the environment the entrypoint was started with.
//!
//! The snapshot is read once and passed explicitly to resolution and to the
//! downstream launch, so nothing depends on ambient process state after
//! startup.

use std::collections::BTreeMap;
use std::ffi::OsString;
use tracing::warn;

/// Force regeneration of artifacts that are otherwise preserved.
pub const FORCE_CFG_UPDATE: &str = "ATL_FORCE_CFG_UPDATE";

/// Set to a falsy value to keep sensitive variables for the downstream process.
pub const UNSET_SENSITIVE_ENV_VARS: &str = "ATL_UNSET_SENSITIVE_ENV_VARS";

/// Explicit application version override.
pub const CONFLUENCE_VERSION: &str = "CONFLUENCE_VERSION";

/// Read-only mapping from variable name to value.
///
/// Absent keys are distinct from keys set to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentView {
    vars: BTreeMap<String, String>,
}

impl EnvironmentView {
    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Build a view from OS strings. Variables whose name or value is not
    /// valid unicode cannot be represented; each one is logged and left out,
    /// so it does not reach the application either.
    pub fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        pairs
            .into_iter()
            .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (Ok(k), Err(_)) => {
                    warn!("Dropping environment var {}: value is not valid UTF-8", k);
                    None
                }
                (Err(k), _) => {
                    warn!(
                        "Dropping environment var {}: name is not valid UTF-8",
                        k.to_string_lossy()
                    );
                    None
                }
            })
            .collect()
    }

    /// Build a view from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// First of `names` that is present, in order.
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Interpret a variable as a boolean flag.
    ///
    /// Returns `None` when the variable is absent or not a recognised
    /// boolean word.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(parse_bool)
    }

    /// Interpret a variable as a boolean flag, falling back to `default`.
    pub fn flag_or(&self, name: &str, default: bool) -> bool {
        self.flag(name).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A copy of this view containing only the variables `keep` accepts.
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            vars: self
                .vars
                .iter()
                .filter(|(k, _)| keep(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentView {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parse the boolean vocabulary accepted for `ATL_*` flags.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}
