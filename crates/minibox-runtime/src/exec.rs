//! Running the target command inside the finished container.

use std::process::Command;

use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ExitStatus;

/// Runs `command[0]` with the remaining arguments and blocks until it exits.
///
/// Standard streams are inherited.
///
/// # Errors
///
/// Returns [`MiniboxError::Config`] if `command` is empty and
/// [`MiniboxError::Spawn`] if the program cannot be started.
pub fn run_target(command: &[String]) -> Result<ExitStatus> {
    let (program, args) = command.split_first().ok_or_else(|| MiniboxError::Config {
        message: "no command given".into(),
    })?;

    tracing::info!(program, ?args, "running target command");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| MiniboxError::Spawn {
            program: program.clone(),
            source: e,
        })?;

    let status = ExitStatus::from(status);
    tracing::info!(program, %status, "target command finished");
    Ok(status)
}

/// Turns a non-zero exit into [`MiniboxError::ChildExit`].
///
/// # Errors
///
/// Returns [`MiniboxError::ChildExit`] carrying the shell-style exit code
/// when `status` is not a clean exit.
pub fn ensure_success(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(MiniboxError::ChildExit {
        program: program.to_string(),
        code: status.code(),
    })
}
