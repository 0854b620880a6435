//! Hand-off to the application start script.

use crate::config::EntrypointSettings;
use crate::env::EnvironmentView;
use anyhow::Result;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// A fully specified downstream process.
#[derive(Debug, Clone)]
pub struct Launch {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: EnvironmentView,
}

impl Launch {
    /// The start script from `settings`, run from the home directory with
    /// exactly the variables in `env`.
    pub fn from_settings(settings: &EntrypointSettings, env: EnvironmentView) -> Self {
        Self {
            program: settings.start_script_path(),
            args: settings.start_args.clone(),
            working_dir: settings.home_dir.clone(),
            env,
        }
    }

    /// Build the command. The inherited environment is cleared.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .env_clear()
            .envs(self.env.iter());
        cmd
    }

    /// Replace this process with the start script so signals reach it
    /// directly. Only returns on failure.
    #[cfg(unix)]
    pub fn exec(&self) -> Result<i32> {
        use anyhow::Context;
        use std::os::unix::process::CommandExt;

        info!(program = %self.program.display(), args = ?self.args, "Starting application");
        let err = self.command().exec();
        Err(err).with_context(|| format!("Failed to exec {}", self.program.display()))
    }

    /// Run the start script and wait for it.
    #[cfg(not(unix))]
    pub fn exec(&self) -> Result<i32> {
        use anyhow::Context;

        info!(program = %self.program.display(), args = ?self.args, "Starting application");
        let status = self
            .command()
            .status()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;
        Ok(status.code().unwrap_or(1))
    }
}
