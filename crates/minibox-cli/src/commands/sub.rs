//! `minibox sub`: the bootstrapper role, started only by `minibox run`.

use std::path::Path;

use clap::Args;
use minibox_common::config::ContainerConfig;
use minibox_runtime::container::Bootstrapper;
use minibox_runtime::exec::ensure_success;

/// Arguments for the internal `sub` command.
#[derive(Args, Debug)]
pub struct SubArgs {
    /// Command to run inside the container, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Executes the `sub` command.
///
/// # Errors
///
/// Returns an error if a bootstrap stage fails, teardown fails, or the
/// target command exits non-zero.
pub fn execute(args: SubArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    if nix::unistd::getpid().as_raw() != 1 {
        tracing::warn!("not PID 1 in a new PID namespace; `sub` should only be started by `run`");
    }

    let config = ContainerConfig::from_optional_path(config_path)?;
    let bootstrapper = Bootstrapper::new(config, args.command)?;
    let status = bootstrapper.run()?;
    ensure_success(&bootstrapper.command()[0], status)?;
    Ok(())
}
