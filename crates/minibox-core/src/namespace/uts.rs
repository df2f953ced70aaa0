//! UTS namespace isolation.
//!
//! Gives the container its own hostname.

use minibox_common::error::{MiniboxError, Result};

/// Sets the hostname inside the current UTS namespace.
///
/// # Errors
///
/// Returns [`MiniboxError::Namespace`] if `sethostname(2)` fails, which
/// happens when the caller lacks `CAP_SYS_ADMIN` in the namespace that owns
/// its UTS namespace.
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| MiniboxError::Namespace {
        step: "set hostname",
        source: e.into(),
    })?;
    tracing::debug!(hostname, "container hostname set");
    Ok(())
}
