//! Configuration resolution.
//!
//! Turns an [`EnvironmentView`] and an optional [`VersionToken`] into the
//! artifacts the application server reads at startup:
//! - **Server descriptor** - connector, context and access-log valves
//! - **Application config** - database, pool family, cluster and setup state
//! - **Login-cookie descriptor** - autologin cookie age
//! - **Init properties** - home directory location
//!
//! ## Overwrite policy
//! The application config is preserved once it exists, so edits made by the
//! application or an operator survive restarts. Setting
//! `ATL_FORCE_CFG_UPDATE` discards it and generates a fresh one. The other
//! artifacts are regenerated on every start.

pub mod application;
mod init;
pub mod seraph;
pub mod server;

use crate::artifact::Artifact;
use crate::config::DEFAULT_HOME_DIR;
use crate::env::{EnvironmentView, FORCE_CFG_UPDATE};
use crate::error::ResolveResult;
use crate::fields::{Resolved, Trace};
use crate::version::VersionToken;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use application::{JoinType, normalize_context_path};

/// One output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    ServerDescriptor,
    ApplicationConfig,
    LoginCookieDescriptor,
    InitProperties,
}

impl TargetKind {
    /// Every target, in write order.
    pub const ALL: [TargetKind; 4] = [
        TargetKind::ServerDescriptor,
        TargetKind::LoginCookieDescriptor,
        TargetKind::InitProperties,
        TargetKind::ApplicationConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::ServerDescriptor => "server-descriptor",
            TargetKind::ApplicationConfig => "application-config",
            TargetKind::LoginCookieDescriptor => "login-cookie-descriptor",
            TargetKind::InitProperties => "init-properties",
        }
    }

    pub fn policy(&self) -> WritePolicy {
        match self {
            TargetKind::ApplicationConfig => WritePolicy::PreserveExisting,
            _ => WritePolicy::AlwaysRegenerate,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a target treats an artifact that is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Keep the existing artifact unless forced.
    PreserveExisting,
    /// Replace on every run.
    AlwaysRegenerate,
}

/// What happens to a target on this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Nothing on disk yet; generate.
    Create,
    /// Existing artifact discarded because of `ATL_FORCE_CFG_UPDATE`.
    ForceOverwrite,
    /// Existing artifact replaced; the target is always regenerated.
    Regenerate,
    /// Existing artifact kept unchanged; no resolution performed.
    Preserve,
}

impl Decision {
    pub fn generates(&self) -> bool {
        !matches!(self, Decision::Preserve)
    }
}

/// Overwrite policy, first match wins.
pub fn decide(policy: WritePolicy, exists: bool, force: bool) -> Decision {
    match (policy, exists) {
        (_, false) => Decision::Create,
        (WritePolicy::AlwaysRegenerate, true) => Decision::Regenerate,
        (WritePolicy::PreserveExisting, true) if force => Decision::ForceOverwrite,
        (WritePolicy::PreserveExisting, true) => Decision::Preserve,
    }
}

/// A freshly generated artifact with the values that went into it.
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub artifact: Artifact,
    pub trace: Vec<Resolved>,
}

/// Outcome of resolving one target against its existing state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Fresh {
        decision: Decision,
        #[serde(flatten)]
        generated: Generated,
    },
    Kept {
        /// Kept byte for byte; not required to be UTF-8.
        #[serde(serialize_with = "serialize_lossy")]
        existing: Vec<u8>,
    },
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

impl Resolution {
    pub fn decision(&self) -> Decision {
        match self {
            Resolution::Fresh { decision, .. } => *decision,
            Resolution::Kept { .. } => Decision::Preserve,
        }
    }

    /// The bytes this resolution leaves on disk.
    pub fn content(&self) -> Vec<u8> {
        match self {
            Resolution::Fresh { generated, .. } => generated.artifact.render().into_bytes(),
            Resolution::Kept { existing } => existing.clone(),
        }
    }
}

/// Resolves artifacts from a fixed environment snapshot and version.
#[derive(Debug, Clone)]
pub struct ConfigResolver<'a> {
    env: &'a EnvironmentView,
    version: Option<VersionToken>,
    home: PathBuf,
}

impl<'a> ConfigResolver<'a> {
    /// Home directory defaults to `CONFLUENCE_HOME`, then the image default.
    pub fn new(env: &'a EnvironmentView, version: Option<VersionToken>) -> Self {
        let home = env
            .get("CONFLUENCE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR));
        Self { env, version, home }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn version(&self) -> Option<VersionToken> {
        self.version
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Whether `ATL_FORCE_CFG_UPDATE` is set to a truthy value.
    pub fn force_overwrite(&self) -> bool {
        self.env.flag_or(FORCE_CFG_UPDATE, false)
    }

    /// Generate `kind` from scratch.
    pub fn generate(&self, kind: TargetKind) -> ResolveResult<Generated> {
        let mut trace = Trace::new();
        let artifact = match kind {
            TargetKind::ServerDescriptor => server::build(self.env, self.version, &mut trace),
            TargetKind::ApplicationConfig => {
                application::build(self.env, self.version, &mut trace)?
            }
            TargetKind::LoginCookieDescriptor => seraph::build(self.env, self.version, &mut trace),
            TargetKind::InitProperties => init::build(&self.home, &mut trace),
        };
        Ok(Generated {
            artifact,
            trace: trace.into_entries(),
        })
    }

    /// Resolve `kind` given what is currently on disk.
    ///
    /// A preserved artifact is returned unchanged and nothing is resolved,
    /// so invalid inputs cannot fail a run that would not use them. For
    /// regenerated targets only the presence of `existing` matters.
    pub fn resolve(&self, kind: TargetKind, existing: Option<Vec<u8>>) -> ResolveResult<Resolution> {
        let decision = decide(kind.policy(), existing.is_some(), self.force_overwrite());
        match (decision, existing) {
            (Decision::Preserve, Some(existing)) => Ok(Resolution::Kept { existing }),
            _ => Ok(Resolution::Fresh {
                decision,
                generated: self.generate(kind)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_table() {
        use Decision::*;
        use WritePolicy::*;
        assert_eq!(decide(PreserveExisting, false, false), Create);
        assert_eq!(decide(PreserveExisting, false, true), Create);
        assert_eq!(decide(PreserveExisting, true, true), ForceOverwrite);
        assert_eq!(decide(PreserveExisting, true, false), Preserve);
        assert_eq!(decide(AlwaysRegenerate, true, false), Regenerate);
        assert_eq!(decide(AlwaysRegenerate, false, false), Create);
    }

    #[test]
    fn test_only_application_config_is_preserved() {
        for kind in TargetKind::ALL {
            let expected = if kind == TargetKind::ApplicationConfig {
                WritePolicy::PreserveExisting
            } else {
                WritePolicy::AlwaysRegenerate
            };
            assert_eq!(kind.policy(), expected, "{}", kind);
        }
    }

    #[test]
    fn test_kept_skips_resolution() {
        // Invalid cluster settings would fail generation.
        let env = EnvironmentView::from_pairs([("ATL_CLUSTER_TYPE", "gossip")]);
        let resolver = ConfigResolver::new(&env, None);
        let res = resolver
            .resolve(TargetKind::ApplicationConfig, Some("<edited/>".into()))
            .unwrap();
        assert_eq!(res.decision(), Decision::Preserve);
        assert_eq!(res.content(), b"<edited/>");
    }

    #[test]
    fn test_kept_content_need_not_be_utf8() {
        let env = EnvironmentView::default();
        let existing = b"<!-- caf\xe9 --><confluence-configuration/>".to_vec();
        let res = ConfigResolver::new(&env, None)
            .resolve(TargetKind::ApplicationConfig, Some(existing.clone()))
            .unwrap();
        assert_eq!(res.content(), existing);

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["outcome"], "kept");
        assert!(json["existing"].as_str().unwrap().contains("confluence-configuration"));
    }

    #[test]
    fn test_home_from_env() {
        let env = EnvironmentView::from_pairs([("CONFLUENCE_HOME", "/tmp/")]);
        let resolver = ConfigResolver::new(&env, None);
        let generated = resolver.generate(TargetKind::InitProperties).unwrap();
        assert_eq!(generated.artifact.property("confluence.home"), Some("/tmp/"));
    }
}
