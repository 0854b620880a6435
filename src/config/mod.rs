//! Entrypoint settings.
//!
//! Consolidates settings from tiers with field-by-field merging:
//! 1. **Defaults** - built in
//! 2. **File** - YAML named by `--config` or `CONFLUENCE_ENTRYPOINT_CONFIG`
//! 3. **Environment** - `CONFLUENCE_INSTALL_DIR`, `CONFLUENCE_HOME`,
//!    `RUN_USER`, `RUN_GROUP`, `RUN_UID`, `RUN_GID`
//! 4. **CLI** - flags applied by the binary
//!
//! `ATL_*` variables are not settings; they are resolution inputs.
//!
//! `RUN_USER` and `RUN_GROUP` are resolved to ids through the account
//! files when `RUN_UID`/`RUN_GID` are not given.

mod accounts;
mod loader;
mod merge;
mod types;

pub use accounts::{GROUP_FILE, PASSWD_FILE};
pub use loader::{ConfigTier, SETTINGS_PATH_VAR, SettingsLoader};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
