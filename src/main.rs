//! Confluence container entrypoint
//!
//! Generates the application's configuration files from `ATL_*` environment
//! variables, drops sensitive variables, and hands off to the start script.

use anyhow::Result;
use clap::Parser;
use confluence_entrypoint::cli::plan::PlanArgs;
use confluence_entrypoint::cli::{Cli, Command};
use confluence_entrypoint::config::{ConfigTier, EntrypointSettings, SettingsLoader};
use confluence_entrypoint::env::EnvironmentView;
use confluence_entrypoint::error::ResolveError;
use confluence_entrypoint::format::format_plan;
use confluence_entrypoint::launch::Launch;
use confluence_entrypoint::logging::{self, LogTarget};
use confluence_entrypoint::resolver::ConfigResolver;
use confluence_entrypoint::sanitize::{self, AllowList};
use confluence_entrypoint::version::{self, VersionToken};
use confluence_entrypoint::writer::{self, PlannedTarget};
use std::process::ExitCode;
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&LogTarget::parse(&cli.log), cli.verbose) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<ResolveError>() {
                Some(resolve_err) => error!(
                    error_code = %resolve_err.code(),
                    field = resolve_err.field().unwrap_or("-"),
                    "{}",
                    resolve_err
                ),
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let env = EnvironmentView::capture();
    let settings = load_settings(&cli, &env)?;

    match cli.command {
        None | Some(Command::Start) => run_start(&env, &settings),
        Some(Command::Render) => {
            render(&env, &settings)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Plan(args)) => run_plan(&env, &settings, &args),
    }
}

/// Settings from all tiers, with CLI flags applied last.
fn load_settings(cli: &Cli, env: &EnvironmentView) -> Result<EntrypointSettings> {
    let mut loader = SettingsLoader::load(env, cli.config.as_deref())?;
    if let Some(path) = loader.settings_path() {
        info!(path = %path.display(), "Using settings file");
    }

    let settings = loader.settings_mut();
    if let Some(install_dir) = &cli.install_dir {
        settings.install_dir = install_dir.clone();
        debug!(tier = %ConfigTier::Cli, "install_dir overridden");
    }
    if let Some(home_dir) = &cli.home_dir {
        settings.home_dir = home_dir.clone();
        debug!(tier = %ConfigTier::Cli, "home_dir overridden");
    }

    Ok(loader.into_settings())
}

fn discover_version(env: &EnvironmentView, settings: &EntrypointSettings) -> Result<Option<VersionToken>> {
    let version = version::discover(env, Some(&settings.version_descriptor_path()))?;
    match version {
        Some(v) => info!(version = %v, "Configuring Confluence"),
        None => info!("Application version unknown, using current defaults"),
    }
    Ok(version)
}

fn plan(env: &EnvironmentView, settings: &EntrypointSettings) -> Result<Vec<PlannedTarget>> {
    let version = discover_version(env, settings)?;
    let resolver = ConfigResolver::new(env, version).with_home(&settings.home_dir);
    writer::plan(&resolver, settings)
}

fn render(env: &EnvironmentView, settings: &EntrypointSettings) -> Result<()> {
    let planned = plan(env, settings)?;
    writer::apply(&planned, settings.ownership())?;
    Ok(())
}

fn run_start(env: &EnvironmentView, settings: &EntrypointSettings) -> Result<ExitCode> {
    render(env, settings)?;

    let scrubbed = sanitize::scrub(env, &AllowList::with_extra(&settings.keep_env));
    debug!(
        kept = scrubbed.env.len(),
        removed = scrubbed.removed.len(),
        "Prepared application environment"
    );

    let code = Launch::from_settings(settings, scrubbed.env).exec()?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

fn run_plan(env: &EnvironmentView, settings: &EntrypointSettings, args: &PlanArgs) -> Result<ExitCode> {
    let planned = plan(env, settings)?;
    println!("{}", format_plan(&planned, args.format)?);
    Ok(ExitCode::SUCCESS)
}
