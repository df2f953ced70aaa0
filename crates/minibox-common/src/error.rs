//! Unified error types for the minibox workspace.
//!
//! Every failure in the bootstrap sequence maps onto one variant of
//! [`MiniboxError`]. Kernel failures carry the underlying
//! [`std::io::Error`] so the diagnostic line keeps the kernel's text.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum MiniboxError {
    /// The re-executed process or the target command could not be created.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A namespace operation (clone flags, id maps, unshare) was rejected.
    #[error("namespace setup failed while trying to {step}: {source}")]
    Namespace {
        /// The operation that was rejected.
        step: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A cgroup control file was missing or refused the written value.
    #[error("cgroup write to {path} failed: {source}")]
    CgroupWrite {
        /// Control file or directory that could not be written.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A mount, bind-mount, or root switch failed.
    #[error("mount on {target} failed: {source}")]
    Mount {
        /// Mount point (or new root) that could not be set up.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Unmounting during teardown failed.
    #[error("unmount of {target} failed: {source}")]
    Unmount {
        /// Mount point that could not be detached.
        target: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A child process exited unsuccessfully.
    #[error("{program} exited with status {code}")]
    ChildExit {
        /// Program whose exit status is reported.
        program: String,
        /// Exit code, with signal deaths reported as `128 + signal`.
        code: i32,
    },

    /// A bootstrap stage failed; wraps the error that aborted it.
    #[error("bootstrap stage '{stage}' failed: {source}")]
    Stage {
        /// Name of the stage that failed.
        stage: &'static str,
        /// Error that aborted the stage.
        #[source]
        source: Box<MiniboxError>,
    },

    /// An I/O operation outside the kernel-setup path failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl MiniboxError {
    /// Wraps `self` with the name of the bootstrap stage it aborted.
    #[must_use]
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the exit code a process reporting this error should use.
    ///
    /// Child exit statuses are propagated unchanged; every other error is a
    /// setup failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ChildExit { code, .. } => *code,
            Self::Stage { source, .. } => source.exit_code(),
            _ => i32::from(crate::constants::SETUP_FAILURE_EXIT_CODE),
        }
    }

    /// Returns the errno behind this error, if it came from the kernel.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Spawn { source, .. }
            | Self::Namespace { source, .. }
            | Self::CgroupWrite { source, .. }
            | Self::Mount { source, .. }
            | Self::Unmount { source, .. }
            | Self::Io { source, .. } => source.raw_os_error(),
            Self::Stage { source, .. } => source.raw_os_error(),
            Self::ChildExit { .. } | Self::Config { .. } | Self::Serialization { .. } => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MiniboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn eperm() -> std::io::Error {
        std::io::Error::from_raw_os_error(1)
    }

    #[test]
    fn child_exit_code_is_propagated() {
        let err = MiniboxError::ChildExit {
            program: "/bin/false".into(),
            code: 3,
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn setup_errors_exit_with_one() {
        let err = MiniboxError::CgroupWrite {
            path: "/sys/fs/cgroup/pids/container/pids.max".into(),
            source: eperm(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn stage_wrapper_keeps_inner_exit_code_and_names_stage() {
        let err = MiniboxError::Mount {
            target: "/proc".into(),
            source: eperm(),
        }
        .in_stage("mount-proc");
        assert_eq!(err.exit_code(), 1);
        assert!(
            err.to_string()
                .starts_with("bootstrap stage 'mount-proc' failed: mount on /proc failed")
        );

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some_and(|s| s.starts_with("mount on /proc failed")));
    }

    #[test]
    fn raw_os_error_reaches_through_stage() {
        let err = MiniboxError::Namespace {
            step: "set hostname",
            source: eperm(),
        }
        .in_stage("init");
        assert_eq!(err.raw_os_error(), Some(1));

        let err = MiniboxError::Config {
            message: "bad".into(),
        };
        assert_eq!(err.raw_os_error(), None);
    }

    #[test]
    fn namespace_error_message_names_the_step() {
        let err = MiniboxError::Namespace {
            step: "write uid_map",
            source: eperm(),
        };
        assert!(err.to_string().contains("write uid_map"));
    }
}
