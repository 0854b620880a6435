//! Sensitive-variable unsetting.
//!
//! Once the artifacts are written, the `ATL_*` inputs (database passwords,
//! license keys) and anything else the operator passed in are no longer
//! needed by the application. Unless `ATL_UNSET_SENSITIVE_ENV_VARS` is
//! explicitly falsy, every variable that is not on the allow-list is dropped
//! from the environment handed to the start script.

use crate::env::{EnvironmentView, UNSET_SENSITIVE_ENV_VARS};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Names always kept.
pub const ALLOWED_NAMES: &[&str] = &[
    "PATH",
    "HOME",
    "HOSTNAME",
    "USER",
    "LOGNAME",
    "SHELL",
    "PWD",
    "SHLVL",
    "TERM",
    "TZ",
    "LANG",
    "LANGUAGE",
    "JAVA_HOME",
    "JAVA_VERSION",
    "JRE_HOME",
    "JAVA_OPTS",
    "RUN_USER",
    "RUN_GROUP",
    "RUN_UID",
    "RUN_GID",
    "CONFLUENCE_HOME",
    "CONFLUENCE_INSTALL_DIR",
    "CONFLUENCE_VERSION",
];

/// Prefixes always kept. The start script reads `JVM_*` and `CATALINA_*`
/// to build the java command line.
pub const ALLOWED_PREFIXES: &[&str] = &["LC_", "JVM_", "CATALINA_"];

/// Variables that survive unsetting.
#[derive(Debug, Clone)]
pub struct AllowList {
    names: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            names: ALLOWED_NAMES.iter().map(|s| s.to_string()).collect(),
            prefixes: ALLOWED_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AllowList {
    /// Default list plus `extra` names.
    pub fn with_extra<S: AsRef<str>>(extra: &[S]) -> Self {
        let mut list = Self::default();
        list.names
            .extend(extra.iter().map(|s| s.as_ref().to_string()));
        list
    }

    pub fn allows(&self, name: &str) -> bool {
        self.names.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Environment for the downstream process and what was removed from it.
#[derive(Debug, Clone)]
pub struct Scrubbed {
    pub env: EnvironmentView,
    pub removed: Vec<String>,
}

/// Whether unsetting is enabled for this environment.
pub fn unset_enabled(env: &EnvironmentView) -> bool {
    env.flag_or(UNSET_SENSITIVE_ENV_VARS, true)
}

/// Drop every variable the allow-list does not cover.
///
/// Logs one line per removed variable. When unsetting is disabled the view
/// is returned unchanged.
pub fn scrub(env: &EnvironmentView, allow: &AllowList) -> Scrubbed {
    if !unset_enabled(env) {
        info!(
            flag = UNSET_SENSITIVE_ENV_VARS,
            "Keeping all environment variables for the application"
        );
        return Scrubbed {
            env: env.clone(),
            removed: Vec::new(),
        };
    }

    let mut removed = Vec::new();
    let kept = env.filtered(|name| {
        if allow.allows(name) {
            true
        } else {
            removed.push(name.to_string());
            false
        }
    });

    for name in &removed {
        warn!("Unsetting environment var {}", name);
    }

    Scrubbed { env: kept, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber writing to a buffer and return the output.
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_unset_logs_once_per_variable() {
        let env = EnvironmentView::from_pairs([("MY_TOKEN", "tokenvalue"), ("PATH", "/usr/bin")]);
        let logs = captured_logs(|| {
            scrub(&env, &AllowList::default());
        });
        let lines: Vec<&str> = logs
            .lines()
            .filter(|l| l.contains("Unsetting environment var"))
            .collect();
        assert_eq!(lines.len(), 1, "{}", logs);
        assert!(lines[0].ends_with("Unsetting environment var MY_TOKEN"), "{}", lines[0]);
    }

    #[test]
    fn test_disabled_logs_no_unset_lines() {
        let env = EnvironmentView::from_pairs([
            ("MY_TOKEN", "tokenvalue"),
            ("ATL_UNSET_SENSITIVE_ENV_VARS", "false"),
        ]);
        let logs = captured_logs(|| {
            scrub(&env, &AllowList::default());
        });
        assert!(!logs.contains("Unsetting environment var"), "{}", logs);
    }

    #[test]
    fn test_token_removed_by_default() {
        let env = EnvironmentView::from_pairs([
            ("MY_TOKEN", "tokenvalue"),
            ("PATH", "/usr/bin"),
            ("ATL_JDBC_PASSWORD", "secret"),
            ("JVM_MINIMUM_MEMORY", "383m"),
        ]);
        let scrubbed = scrub(&env, &AllowList::default());
        assert_eq!(scrubbed.removed, vec!["ATL_JDBC_PASSWORD", "MY_TOKEN"]);
        assert_eq!(scrubbed.env.get("PATH"), Some("/usr/bin"));
        assert_eq!(scrubbed.env.get("JVM_MINIMUM_MEMORY"), Some("383m"));
        assert_eq!(scrubbed.env.get("MY_TOKEN"), None);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let env = EnvironmentView::from_pairs([
            ("MY_TOKEN", "tokenvalue"),
            ("ATL_UNSET_SENSITIVE_ENV_VARS", "false"),
        ]);
        let scrubbed = scrub(&env, &AllowList::default());
        assert!(scrubbed.removed.is_empty());
        assert_eq!(scrubbed.env, env);
    }

    #[test]
    fn test_unrecognised_flag_keeps_default() {
        let env = EnvironmentView::from_pairs([("ATL_UNSET_SENSITIVE_ENV_VARS", "perhaps")]);
        assert!(unset_enabled(&env));
    }

    #[test]
    fn test_extra_names() {
        let allow = AllowList::with_extra(&["MY_TOKEN"]);
        assert!(allow.allows("MY_TOKEN"));
        assert!(allow.allows("LC_ALL"));
        assert!(!allow.allows("MY_SECRET"));
    }
}
