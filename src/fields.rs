//! Field definitions and the evaluator that resolves them.
//!
//! A field names one value inside an artifact together with the variables
//! that may supply it. Precedence is fixed: a present source variable
//! (first present in declaration order) always wins, then a version-gated
//! default when the gate is satisfied, then the static default. Values from
//! the environment are used verbatim.

use crate::env::EnvironmentView;
use crate::version::{self, VersionToken};
use serde::Serialize;

/// Default applied when no source variable is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefault {
    /// Used when no gate applies.
    pub value: &'static str,
    /// `(since, value)`: used instead when the version is at or past `since`.
    pub gated: Option<(VersionToken, &'static str)>,
}

/// A named target inside an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactField {
    pub name: &'static str,
    pub sources: &'static [&'static str],
    pub default: FieldDefault,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "from", content = "detail", rename_all = "snake_case")]
pub enum Origin {
    /// Taken verbatim from the named variable.
    Env(String),
    /// Version-gated default.
    GatedDefault,
    /// Static default.
    StaticDefault,
    /// Fixed value, not configurable.
    Fixed,
    /// Derived from other resolved values.
    Derived,
}

/// A field value after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub field: String,
    pub value: String,
    pub origin: Origin,
}

impl ArtifactField {
    pub const fn new(
        name: &'static str,
        sources: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            sources,
            default: FieldDefault {
                value: default,
                gated: None,
            },
        }
    }

    /// Field whose default changes at `since`.
    pub const fn gated(
        name: &'static str,
        sources: &'static [&'static str],
        older: &'static str,
        since: VersionToken,
        newer: &'static str,
    ) -> Self {
        Self {
            name,
            sources,
            default: FieldDefault {
                value: older,
                gated: Some((since, newer)),
            },
        }
    }

    /// The default that applies for `version`, ignoring the environment.
    pub fn default_for(&self, version: Option<VersionToken>) -> (&'static str, Origin) {
        match self.default.gated {
            Some((since, newer)) if version::satisfies(version, since) => {
                (newer, Origin::GatedDefault)
            }
            _ => (self.default.value, Origin::StaticDefault),
        }
    }

    /// Resolve against the environment and version.
    pub fn resolve(&self, env: &EnvironmentView, version: Option<VersionToken>) -> Resolved {
        if let Some((source, value)) = self
            .sources
            .iter()
            .find_map(|s| env.get(s).map(|v| (*s, v)))
        {
            return Resolved {
                field: self.name.to_string(),
                value: value.to_string(),
                origin: Origin::Env(source.to_string()),
            };
        }

        let (value, origin) = self.default_for(version);
        Resolved {
            field: self.name.to_string(),
            value: value.to_string(),
            origin,
        }
    }
}

/// Accumulates resolved values in the order they were produced.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    entries: Vec<Resolved>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `field`, record it, and return its value.
    pub fn take(
        &mut self,
        field: &ArtifactField,
        env: &EnvironmentView,
        version: Option<VersionToken>,
    ) -> String {
        let resolved = field.resolve(env, version);
        let value = resolved.value.clone();
        self.entries.push(resolved);
        value
    }

    /// Record a value that did not come from a field table.
    pub fn record(&mut self, field: &str, value: impl Into<String>, origin: Origin) -> String {
        let value = value.into();
        self.entries.push(Resolved {
            field: field.to_string(),
            value: value.clone(),
            origin,
        });
        value
    }

    pub fn entries(&self) -> &[Resolved] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Resolved> {
        self.entries
    }
}
