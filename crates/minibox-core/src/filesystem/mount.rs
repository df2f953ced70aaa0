//! Scoped mounts for container filesystem setup.
//!
//! Every mount made while bootstrapping is recorded on a [`MountStack`].
//! The stack unmounts in reverse order, either explicitly through
//! [`MountStack::unwind_with`] or when it is dropped on an error path, so a
//! failure halfway through setup never leaves earlier mounts behind.

use std::path::{Path, PathBuf};

use minibox_common::error::{MiniboxError, Result};
use nix::mount::{MntFlags, MsFlags, mount, umount2};

/// One mount performed during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// Mount source, e.g. `proc` or the bind source directory.
    pub source: PathBuf,
    /// Mount point, as reachable from the current root.
    pub target: PathBuf,
    /// Filesystem type; `None` for bind mounts.
    pub fstype: Option<String>,
    /// Flags passed to `mount(2)`.
    pub flags: MsFlags,
}

impl MountRecord {
    /// A bind mount of `source` onto `target`.
    #[must_use]
    pub fn bind(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fstype: None,
            flags: MsFlags::MS_BIND,
        }
    }

    /// A fresh procfs mounted on `target`.
    #[must_use]
    pub fn proc(target: impl Into<PathBuf>) -> Self {
        Self {
            source: PathBuf::from("proc"),
            target: target.into(),
            fstype: Some("proc".to_string()),
            flags: MsFlags::empty(),
        }
    }
}

/// Mounts made so far, most recent last.
#[derive(Debug, Default)]
pub struct MountStack {
    records: Vec<MountRecord>,
}

impl MountStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Hands `record` to `mount` and pushes it on the stack if that
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `mount`; nothing is pushed.
    pub fn mount_with<F>(&mut self, record: MountRecord, mount: F) -> Result<()>
    where
        F: FnOnce(&MountRecord) -> Result<()>,
    {
        mount(&record)?;
        self.track(record);
        Ok(())
    }

    /// Records a mount that is already in place so it is unwound with the
    /// rest of the stack.
    pub fn track(&mut self, record: MountRecord) {
        self.records.push(record);
    }

    /// Re-expresses every target as seen from inside `new_root`.
    ///
    /// Must be called right after the process switches its root, since the
    /// host paths recorded before the switch no longer resolve.
    pub fn rebase(&mut self, new_root: &Path) {
        for record in &mut self.records {
            match record.target.strip_prefix(new_root) {
                Ok(relative) => record.target = Path::new("/").join(relative),
                Err(_) => tracing::warn!(
                    mount_point = %record.target.display(),
                    new_root = %new_root.display(),
                    "mount lies outside the new root and cannot be rebased"
                ),
            }
        }
    }

    /// Mount points in the order they were mounted.
    pub fn targets(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.target.as_path())
    }

    /// Number of mounts still held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether no mounts are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pops every record, most recent first, handing each to `unmount`.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `unmount`, after every record
    /// has been handed over.
    pub fn unwind_with<F>(&mut self, mut unmount: F) -> Result<()>
    where
        F: FnMut(&MountRecord) -> Result<()>,
    {
        let mut first_error = None;
        while let Some(record) = self.records.pop() {
            if let Err(e) = unmount(&record) {
                tracing::warn!(mount_point = %record.target.display(), error = %e, "unmount failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for MountStack {
    fn drop(&mut self) {
        if self.records.is_empty() {
            return;
        }
        tracing::warn!(
            remaining = self.records.len(),
            "mount stack dropped without teardown; unwinding"
        );
        // Failures were already logged by unwind_with.
        let _ = self.unwind_with(unmount_record);
    }
}

/// Performs the mount described by `record`.
///
/// Bind-mount targets that do not exist yet are created as directories.
///
/// # Errors
///
/// Returns [`MiniboxError::Mount`] if the mount point cannot be created or
/// `mount(2)` fails.
pub fn mount_record(record: &MountRecord) -> Result<()> {
    if record.flags.contains(MsFlags::MS_BIND) && !record.target.exists() {
        std::fs::create_dir_all(&record.target).map_err(|e| MiniboxError::Mount {
            target: record.target.clone(),
            source: e,
        })?;
    }

    mount(
        Some(record.source.as_path()),
        record.target.as_path(),
        record.fstype.as_deref(),
        record.flags,
        None::<&str>,
    )
    .map_err(|e| MiniboxError::Mount {
        target: record.target.clone(),
        source: e.into(),
    })?;

    tracing::debug!(
        source = %record.source.display(),
        mount_point = %record.target.display(),
        fstype = record.fstype.as_deref().unwrap_or("bind"),
        "mounted"
    );
    Ok(())
}

/// Detaches the mount point of `record`.
///
/// # Errors
///
/// Returns [`MiniboxError::Unmount`] if `umount2(2)` fails.
pub fn unmount_record(record: &MountRecord) -> Result<()> {
    umount2(record.target.as_path(), MntFlags::empty()).map_err(|e| MiniboxError::Unmount {
        target: record.target.clone(),
        source: e.into(),
    })?;
    tracing::debug!(mount_point = %record.target.display(), "unmounted");
    Ok(())
}
