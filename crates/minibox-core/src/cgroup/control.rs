//! Cgroup control-file access.
//!
//! Control files are provided by the kernel; writing never creates them, so
//! a missing file surfaces as an error instead of a stray regular file.

use std::io::Write;
use std::path::Path;

use minibox_common::error::{MiniboxError, Result};

/// Writes `value` to the existing control file at `path`.
///
/// # Errors
///
/// Returns [`MiniboxError::CgroupWrite`] if the file does not exist or the
/// kernel rejects the value.
pub fn write_control(path: &Path, value: &str) -> Result<()> {
    let to_error = |e| MiniboxError::CgroupWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(to_error)?;
    file.write_all(value.as_bytes()).map_err(to_error)?;
    tracing::debug!(path = %path.display(), value, "cgroup control written");
    Ok(())
}

/// Creates the group directory `dir` if it does not exist yet.
///
/// # Errors
///
/// Returns [`MiniboxError::CgroupWrite`] if the directory cannot be
/// created, typically because the controller is not mounted.
pub fn ensure_group(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| MiniboxError::CgroupWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %dir.display(), "cgroup created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pids.max");
        std::fs::write(&file, "max").unwrap();

        write_control(&file, "30").unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "30");
    }

    #[test]
    fn write_never_creates_the_control_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("memory.limit_in_bytes");

        let err = write_control(&file, "31457280").unwrap_err();

        assert!(matches!(err, MiniboxError::CgroupWrite { .. }));
        assert!(!file.exists());
    }

    #[test]
    fn ensure_group_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let group = dir.path().join("pids").join("container");

        ensure_group(&group).unwrap();
        ensure_group(&group).unwrap();

        assert!(group.is_dir());
    }
}
