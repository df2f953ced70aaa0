//! User namespace identity mapping.
//!
//! Maps container UID/GID 0 onto the unprivileged host user that invoked
//! the launcher, enabling rootless containers.

use std::fmt;
use std::path::{Path, PathBuf};

use minibox_common::error::{MiniboxError, Result};
use nix::unistd::{Gid, Pid, Uid};

/// One line of a `/proc/<pid>/uid_map` or `gid_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    /// First ID inside the namespace.
    pub container_id: u32,
    /// First ID on the host.
    pub host_id: u32,
    /// Number of consecutive IDs mapped.
    pub size: u32,
}

impl IdMapping {
    /// Maps a single container ID onto a single host ID.
    #[must_use]
    pub const fn single(container_id: u32, host_id: u32) -> Self {
        Self {
            container_id,
            host_id,
            size: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.container_id, self.host_id, self.size)
    }
}

/// The UID and GID maps of a new user namespace: exactly one entry each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMapping {
    /// UID map entry.
    pub uid: IdMapping,
    /// GID map entry.
    pub gid: IdMapping,
}

impl IdentityMapping {
    /// Maps container root onto the calling process's real UID and GID.
    #[must_use]
    pub fn root_to_invoking_user() -> Self {
        Self::root_to(Uid::current(), Gid::current())
    }

    /// Maps container root onto the given host user and group.
    #[must_use]
    pub fn root_to(uid: Uid, gid: Gid) -> Self {
        Self {
            uid: IdMapping::single(0, uid.as_raw()),
            gid: IdMapping::single(0, gid.as_raw()),
        }
    }

    /// Writes the maps for the process `pid` through `/proc`.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Namespace`] if any of the map files rejects
    /// the write.
    pub fn apply(&self, pid: Pid) -> Result<()> {
        self.apply_at(&proc_dir(pid))?;
        tracing::debug!(%pid, uid = %self.uid, gid = %self.gid, "wrote UID/GID map");
        Ok(())
    }

    /// Writes `uid_map`, `setgroups`, and `gid_map` inside `dir`.
    ///
    /// `setgroups` is set to `deny` before `gid_map` is written, which the
    /// kernel requires of an unprivileged writer. Kernels without the
    /// `setgroups` file skip that step.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Namespace`] naming the file that failed.
    pub fn apply_at(&self, dir: &Path) -> Result<()> {
        write_map_file(&dir.join("uid_map"), &self.uid.to_string(), "write uid_map")?;

        let setgroups = dir.join("setgroups");
        if setgroups.exists() {
            write_map_file(&setgroups, "deny", "deny setgroups")?;
        }

        write_map_file(&dir.join("gid_map"), &self.gid.to_string(), "write gid_map")
    }
}

/// The IDs a process switches to inside the new user namespace before it
/// runs anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    /// User ID inside the namespace.
    pub uid: Uid,
    /// Group ID inside the namespace.
    pub gid: Gid,
}

impl Credential {
    /// UID/GID 0.
    #[must_use]
    pub fn root() -> Self {
        Self {
            uid: Uid::from_raw(0),
            gid: Gid::from_raw(0),
        }
    }

    /// Switches the calling process to this credential, group first.
    ///
    /// Called in the clone child, so it only issues the two syscalls.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Namespace`] if either ID is not mapped in the
    /// current user namespace.
    pub fn assume(&self) -> Result<()> {
        nix::unistd::setgid(self.gid).map_err(|e| MiniboxError::Namespace {
            step: "set gid",
            source: e.into(),
        })?;
        nix::unistd::setuid(self.uid).map_err(|e| MiniboxError::Namespace {
            step: "set uid",
            source: e.into(),
        })
    }
}

fn proc_dir(pid: Pid) -> PathBuf {
    PathBuf::from("/proc").join(pid.to_string())
}

fn write_map_file(path: &Path, contents: &str, step: &'static str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| MiniboxError::Namespace { step, source: e })
}
