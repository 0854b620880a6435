//! Planning and writing artifacts.
//!
//! Every target is resolved in memory before anything touches the disk, so
//! a resolution failure leaves all existing files as they were. Every write
//! goes to a sibling temp file first, so a failed write never leaves a
//! partial artifact under the real name. Preserved targets are published
//! with a hard link, which fails if the file appeared in the meantime;
//! regenerated targets are renamed over the old file.

use crate::config::EntrypointSettings;
use crate::resolver::{ConfigResolver, Decision, Resolution, TargetKind, WritePolicy};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One target with its resolution.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTarget {
    pub kind: TargetKind,
    pub path: PathBuf,
    pub resolution: Resolution,
}

/// What a write actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    Preserved,
}

/// What is on disk for a target. Preserved targets are read as bytes;
/// regenerated targets only need to exist.
fn existing_state(path: &Path, policy: WritePolicy) -> Result<Option<Vec<u8>>> {
    let found = match policy {
        WritePolicy::PreserveExisting => fs::read(path).map(Some),
        WritePolicy::AlwaysRegenerate => fs::symlink_metadata(path).map(|_| Some(Vec::new())),
    };
    match found {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        other => other.with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Resolve every target against the current disk state.
///
/// Resolution failures are returned as [`ResolveError`](crate::error::ResolveError)
/// inside the `anyhow` error and can be recovered with `downcast_ref`.
pub fn plan(
    resolver: &ConfigResolver<'_>,
    settings: &EntrypointSettings,
) -> Result<Vec<PlannedTarget>> {
    let mut planned = Vec::with_capacity(TargetKind::ALL.len());
    for kind in TargetKind::ALL {
        let path = settings.target_path(kind);
        let existing = existing_state(&path, kind.policy())?;
        let resolution = resolver.resolve(kind, existing)?;
        debug!(artifact = %kind, path = %path.display(), decision = ?resolution.decision(), "Planned");
        planned.push(PlannedTarget {
            kind,
            path,
            resolution,
        });
    }
    Ok(planned)
}

/// Write planned targets.
pub fn apply(
    planned: &[PlannedTarget],
    ownership: Option<(Option<u32>, Option<u32>)>,
) -> Result<Vec<WriteOutcome>> {
    planned
        .iter()
        .map(|target| apply_one(target, ownership))
        .collect()
}

fn apply_one(
    target: &PlannedTarget,
    ownership: Option<(Option<u32>, Option<u32>)>,
) -> Result<WriteOutcome> {
    let path = &target.path;
    let decision = target.resolution.decision();

    if decision == Decision::Preserve {
        info!(artifact = %target.kind, path = %path.display(), "Keeping existing configuration");
        return Ok(WriteOutcome::Preserved);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = target.resolution.content();
    let written = match (target.kind.policy(), decision) {
        (WritePolicy::PreserveExisting, Decision::Create) => create_new(path, &content)?,
        _ => {
            replace(path, &content)?;
            true
        }
    };

    if !written {
        info!(
            artifact = %target.kind,
            path = %path.display(),
            "Configuration appeared concurrently, keeping it"
        );
        return Ok(WriteOutcome::Preserved);
    }

    if target.kind == TargetKind::ApplicationConfig
        && let Some((uid, gid)) = ownership
    {
        set_owner(path, uid, gid)?;
    }

    info!(
        artifact = %target.kind,
        path = %path.display(),
        decision = ?decision,
        "Generated configuration"
    );
    Ok(WriteOutcome::Written)
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// Write `content` to the temp sibling of `path` and flush it.
fn write_temp(path: &Path, content: &[u8]) -> Result<PathBuf> {
    let tmp = temp_path(path);
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
    }
    Ok(tmp)
}

/// Create `path` only if it does not exist. Returns false if it did.
fn create_new(path: &Path, content: &[u8]) -> Result<bool> {
    let tmp = write_temp(path, content)?;
    let linked = fs::hard_link(&tmp, path);
    let _ = fs::remove_file(&tmp);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to create {}", path.display())),
    }
}

/// Replace `path` atomically.
fn replace(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = write_temp(path, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to move {} into place", path.display()));
    }
    Ok(())
}

/// Change the owner of `path`. Without the privilege to do so (the
/// entrypoint is not running as root) the file keeps the process owner.
#[cfg(unix)]
fn set_owner(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
    match std::os::unix::fs::chown(path, uid, gid) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %path.display(), ?uid, ?gid, "Not permitted to change owner, leaving as is");
            Ok(())
        }
        other => other.with_context(|| format!("Failed to change owner of {}", path.display())),
    }
}

#[cfg(not(unix))]
fn set_owner(path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<()> {
    debug!(path = %path.display(), "Ownership not supported on this platform");
    Ok(())
}
