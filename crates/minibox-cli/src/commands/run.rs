//! `minibox run`: launch a command in a new container.

use std::path::Path;

use clap::Args;
use minibox_common::config::ContainerConfig;
use minibox_common::constants::SELF_EXE;
use minibox_runtime::exec::ensure_success;
use minibox_runtime::launcher::launch;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// The configuration is validated here so a bad file fails before any
/// namespace is created.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the handoff fails, or
/// the bootstrapper exits non-zero.
pub fn execute(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = ContainerConfig::from_optional_path(config_path)?;
    tracing::debug!(rootfs = %config.rootfs.display(), "configuration accepted");

    let status = launch(&args.command, config_path)?;
    ensure_success(SELF_EXE, status)?;
    Ok(())
}
