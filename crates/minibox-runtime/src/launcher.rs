//! The launcher: hands off to the bootstrapper in new namespaces and waits.

use std::path::Path;

use minibox_common::error::Result;
use minibox_common::types::ExitStatus;

use crate::process::Handoff;

/// Re-executes this binary as the bootstrapper for `command` and blocks
/// until it exits.
///
/// # Errors
///
/// Returns the handoff's [`Spawn`](minibox_common::error::MiniboxError::Spawn)
/// or [`Namespace`](minibox_common::error::MiniboxError::Namespace) error, or
/// a wait failure. A non-zero exit is returned as a status, not an error.
pub fn launch(command: &[String], config_path: Option<&Path>) -> Result<ExitStatus> {
    let handoff = Handoff::bootstrap(command, config_path)?;
    let child = handoff.spawn()?;
    tracing::info!(pid = %child.pid(), ?command, "bootstrapper started");

    let status = child.wait()?;
    tracing::info!(%status, "bootstrapper exited");
    Ok(status)
}
