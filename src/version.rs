//! Application version tokens and version discovery.

use crate::env::{CONFLUENCE_VERSION, EnvironmentView};
use crate::error::{ResolveError, ResolveResult};
use regex_lite::Regex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Parsed `major.minor.patch` version.
///
/// Ordering is numeric by component. Any `-qualifier` suffix on the input
/// is accepted but does not take part in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VersionToken {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Release in which the pool family and the access-log default changed.
pub const ACCESS_LOG_AND_HIKARI_SINCE: VersionToken = VersionToken::new(7, 11, 0);

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:-[0-9A-Za-z.\-]+)?$")
            .expect("version pattern is valid")
    })
}

impl VersionToken {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `MAJOR.MINOR[.PATCH][-qualifier]`. A missing patch is 0.
    pub fn parse(raw: &str) -> ResolveResult<Self> {
        let trimmed = raw.trim();
        let caps = version_pattern()
            .captures(trimmed)
            .ok_or_else(|| ResolveError::malformed_version(raw))?;

        let component = |idx: usize| -> ResolveResult<u32> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u32>()
                    .map_err(|_| ResolveError::malformed_version(raw)),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
        })
    }

    /// Whether this version is at or beyond `gate`.
    pub fn at_least(&self, gate: VersionToken) -> bool {
        *self >= gate
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for VersionToken {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether an optional version satisfies `gate`.
///
/// An absent version takes the newest behaviour.
pub fn satisfies(version: Option<VersionToken>, gate: VersionToken) -> bool {
    version.is_none_or(|v| v.at_least(gate))
}

/// Determine the application version.
///
/// `CONFLUENCE_VERSION` wins when set. Otherwise the `version=` entry of the
/// descriptor file is used if the file exists. Returns `Ok(None)` when
/// neither source is available; a malformed token from either source is an
/// error.
pub fn discover(env: &EnvironmentView, descriptor: Option<&Path>) -> ResolveResult<Option<VersionToken>> {
    if let Some(raw) = env.get(CONFLUENCE_VERSION) {
        debug!(source = CONFLUENCE_VERSION, raw, "Using version override");
        return VersionToken::parse(raw).map(Some);
    }

    let Some(path) = descriptor else {
        return Ok(None);
    };
    let Ok(content) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "No version descriptor found");
        return Ok(None);
    };

    match descriptor_version(&content) {
        Some(raw) => {
            debug!(path = %path.display(), raw, "Using version from descriptor");
            VersionToken::parse(raw).map(Some)
        }
        None => Ok(None),
    }
}

/// Extract the `version` key from Java properties text.
fn descriptor_version(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with('!'))
        .find_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            (key.trim() == "version").then(|| value.trim())
        })
}
