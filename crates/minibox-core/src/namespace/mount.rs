//! Mount namespace isolation.
//!
//! Gives the container its own mount table whose changes never propagate
//! back to the host.

use minibox_common::error::{MiniboxError, Result};
use nix::mount::{MsFlags, mount};
use nix::sched::{CloneFlags, unshare};

/// Unshares the mount namespace and recursively marks every mount in it
/// private.
///
/// A fresh mount namespace inherits shared propagation from the host; until
/// `/` is made private, a mount or unmount inside the container would be
/// replayed on the host.
///
/// # Errors
///
/// Returns [`MiniboxError::Namespace`] if `unshare(2)` or the propagation
/// change is rejected.
pub fn make_mounts_private(flags: CloneFlags) -> Result<()> {
    if flags.is_empty() {
        return Ok(());
    }
    unshare(flags).map_err(|e| MiniboxError::Namespace {
        step: "unshare mount namespace",
        source: e.into(),
    })?;
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| MiniboxError::Namespace {
        step: "make mounts private",
        source: e.into(),
    })
}
