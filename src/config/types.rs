//! Entrypoint settings.
//!
//! These describe where the application lives and how it is launched. They
//! are separate from the `ATL_*` variables, which feed resolution.

use super::accounts::{self, GROUP_FILE, PASSWD_FILE};
use crate::resolver::TargetKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default application install directory.
pub const DEFAULT_INSTALL_DIR: &str = "/opt/atlassian/confluence";

/// Default application home directory.
pub const DEFAULT_HOME_DIR: &str = "/var/atlassian/application-data/confluence";

/// Version descriptor inside the install directory.
pub const VERSION_DESCRIPTOR: &str =
    "confluence/META-INF/maven/com.atlassian.confluence/confluence-webapp/pom.properties";

/// Entrypoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointSettings {
    /// Application install directory (`CONFLUENCE_INSTALL_DIR`).
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Application home directory (`CONFLUENCE_HOME`).
    #[serde(default = "default_home_dir")]
    pub home_dir: PathBuf,

    /// User the application runs as (`RUN_USER`).
    #[serde(default = "default_run_user")]
    pub run_user: String,

    /// Group the application runs as (`RUN_GROUP`).
    #[serde(default = "default_run_group")]
    pub run_group: String,

    /// Numeric owner of the application config (`RUN_UID`); wins over
    /// `run_user`.
    #[serde(default)]
    pub run_uid: Option<u32>,

    /// Numeric group of the application config (`RUN_GID`); wins over
    /// `run_group`.
    #[serde(default)]
    pub run_gid: Option<u32>,

    /// User database for resolving `run_user`.
    #[serde(default = "default_passwd_file")]
    pub passwd_file: PathBuf,

    /// Group database for resolving `run_group`.
    #[serde(default = "default_group_file")]
    pub group_file: PathBuf,

    /// Properties file carrying `version=`; relative paths are under the
    /// install directory.
    #[serde(default = "default_version_descriptor")]
    pub version_descriptor: PathBuf,

    /// Start script; relative paths are under the install directory.
    #[serde(default = "default_start_script")]
    pub start_script: PathBuf,

    /// Arguments passed to the start script.
    #[serde(default = "default_start_args")]
    pub start_args: Vec<String>,

    /// Extra variable names kept when sensitive variables are unset.
    #[serde(default)]
    pub keep_env: Vec<String>,
}

impl Default for EntrypointSettings {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            home_dir: default_home_dir(),
            run_user: default_run_user(),
            run_group: default_run_group(),
            run_uid: None,
            run_gid: None,
            passwd_file: default_passwd_file(),
            group_file: default_group_file(),
            version_descriptor: default_version_descriptor(),
            start_script: default_start_script(),
            start_args: default_start_args(),
            keep_env: Vec::new(),
        }
    }
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_DIR)
}

fn default_home_dir() -> PathBuf {
    PathBuf::from(DEFAULT_HOME_DIR)
}

fn default_run_user() -> String {
    "confluence".to_string()
}

fn default_run_group() -> String {
    "confluence".to_string()
}

fn default_passwd_file() -> PathBuf {
    PathBuf::from(PASSWD_FILE)
}

fn default_group_file() -> PathBuf {
    PathBuf::from(GROUP_FILE)
}

fn default_version_descriptor() -> PathBuf {
    PathBuf::from(VERSION_DESCRIPTOR)
}

fn default_start_script() -> PathBuf {
    PathBuf::from("bin/start-confluence.sh")
}

fn default_start_args() -> Vec<String> {
    vec!["-fg".to_string()]
}

impl EntrypointSettings {
    fn under_install(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.install_dir.join(path)
        }
    }

    /// Where `kind` is written.
    pub fn target_path(&self, kind: TargetKind) -> PathBuf {
        let classes = self.install_dir.join("confluence/WEB-INF/classes");
        match kind {
            TargetKind::ServerDescriptor => self.install_dir.join("conf/server.xml"),
            TargetKind::ApplicationConfig => self.home_dir.join("confluence.cfg.xml"),
            TargetKind::LoginCookieDescriptor => classes.join("seraph-config.xml"),
            TargetKind::InitProperties => classes.join("confluence-init.properties"),
        }
    }

    pub fn version_descriptor_path(&self) -> PathBuf {
        self.under_install(&self.version_descriptor)
    }

    pub fn start_script_path(&self) -> PathBuf {
        self.under_install(&self.start_script)
    }

    /// Owner for the application config: numeric ids if given, else the
    /// run user and group looked up by name. `None` if neither resolves.
    pub fn ownership(&self) -> Option<(Option<u32>, Option<u32>)> {
        let uid = self
            .run_uid
            .or_else(|| accounts::lookup_id(&self.passwd_file, &self.run_user));
        let gid = self
            .run_gid
            .or_else(|| accounts::lookup_id(&self.group_file, &self.run_group));
        (uid.is_some() || gid.is_some()).then_some((uid, gid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_paths() {
        let settings = EntrypointSettings::default();
        assert_eq!(
            settings.target_path(TargetKind::ServerDescriptor),
            PathBuf::from("/opt/atlassian/confluence/conf/server.xml")
        );
        assert_eq!(
            settings.target_path(TargetKind::ApplicationConfig),
            PathBuf::from("/var/atlassian/application-data/confluence/confluence.cfg.xml")
        );
        assert_eq!(
            settings.target_path(TargetKind::LoginCookieDescriptor),
            PathBuf::from("/opt/atlassian/confluence/confluence/WEB-INF/classes/seraph-config.xml")
        );
    }

    #[test]
    fn test_relative_paths_under_install() {
        let settings = EntrypointSettings {
            start_script: PathBuf::from("/usr/local/bin/start.sh"),
            ..Default::default()
        };
        assert_eq!(settings.start_script_path(), PathBuf::from("/usr/local/bin/start.sh"));
        assert!(settings.version_descriptor_path().starts_with(DEFAULT_INSTALL_DIR));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings: EntrypointSettings = serde_yaml::from_str("home_dir: /data\n").unwrap();
        assert_eq!(settings.home_dir, PathBuf::from("/data"));
        assert_eq!(settings.install_dir, PathBuf::from(DEFAULT_INSTALL_DIR));
        assert_eq!(settings.start_args, vec!["-fg"]);
        assert_eq!(settings.passwd_file, PathBuf::from("/etc/passwd"));
    }

    fn with_account_files(dir: &tempfile::TempDir) -> EntrypointSettings {
        let passwd = dir.path().join("passwd");
        let group = dir.path().join("group");
        std::fs::write(&passwd, "root:x:0:0::/root:/bin/sh\nconfluence:x:2002:2002::/home:/bin/sh\n")
            .unwrap();
        std::fs::write(&group, "root:x:0:\nconfluence:x:2003:\n").unwrap();
        EntrypointSettings {
            passwd_file: passwd,
            group_file: group,
            ..Default::default()
        }
    }

    #[test]
    fn test_ownership_from_run_user_and_group() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = with_account_files(&dir);
        assert_eq!(settings.ownership(), Some((Some(2002), Some(2003))));
    }

    #[test]
    fn test_numeric_ids_win_over_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = EntrypointSettings {
            run_uid: Some(1000),
            ..with_account_files(&dir)
        };
        assert_eq!(settings.ownership(), Some((Some(1000), Some(2003))));
    }

    #[test]
    fn test_unknown_accounts_leave_ownership_unchanged() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = EntrypointSettings {
            run_user: "nobody-here".into(),
            run_group: "nobody-here".into(),
            ..with_account_files(&dir)
        };
        assert_eq!(settings.ownership(), None);
    }
}
