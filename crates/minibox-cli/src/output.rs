//! Turning a failed command into a diagnostic and an exit code.

use std::process::ExitCode;

use minibox_common::constants::SETUP_FAILURE_EXIT_CODE;
use minibox_common::error::MiniboxError;

/// Logs `err` and returns the process exit code for it.
///
/// A child's non-zero exit was already reported by the child, so it is only
/// logged at `info`; anything else gets a single `error` line.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<MiniboxError>() {
        Some(e @ MiniboxError::ChildExit { .. }) => tracing::info!("{e}"),
        _ => tracing::error!("{err}"),
    }
    ExitCode::from(exit_code_for(err))
}

/// Exit code for `err`: a child's status is propagated, everything else is
/// a setup failure.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<MiniboxError>()
        .map(MiniboxError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|&code| code != 0)
        .unwrap_or(SETUP_FAILURE_EXIT_CODE)
}
