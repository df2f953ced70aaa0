//! Root filesystem switching via `chroot(2)`.
//!
//! `chroot` only changes how absolute paths resolve; the working directory
//! keeps pointing at the old tree until [`enter_root`] resets it. The two
//! calls are separate so bookkeeping tied to the new root can run in
//! between.

use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

/// Makes `new_root` the process's `/`.
///
/// # Errors
///
/// Returns [`MiniboxError::Mount`] naming `new_root` if `chroot(2)` fails.
pub fn change_root(new_root: &Path) -> Result<()> {
    nix::unistd::chroot(new_root).map_err(|e| MiniboxError::Mount {
        target: new_root.to_path_buf(),
        source: e.into(),
    })?;
    tracing::info!(new_root = %new_root.display(), "switched root");
    Ok(())
}

/// Moves the working directory to the current `/`.
///
/// # Errors
///
/// Returns [`MiniboxError::Mount`] naming `/` if `chdir(2)` fails.
pub fn enter_root() -> Result<()> {
    nix::unistd::chdir("/").map_err(|e| MiniboxError::Mount {
        target: "/".into(),
        source: e.into(),
    })
}
