//! Domain primitive types used across the minibox workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cgroup limit: the value written to one control file of one
/// controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgroupLimit {
    /// Controller name, e.g. `pids`.
    pub subsystem: String,
    /// Control file inside the controller's group, e.g. `pids.max`.
    pub control_file: String,
    /// Literal value written to the control file.
    pub value: String,
}

impl CgroupLimit {
    /// Creates a limit from its parts.
    #[must_use]
    pub fn new(
        subsystem: impl Into<String>,
        control_file: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            control_file: control_file.into(),
            value: value.into(),
        }
    }

    /// The fixed limit set: 30 tasks, 30 MiB of memory, and half a CPU.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("pids", "pids.max", "30"),
            Self::new("memory", "memory.limit_in_bytes", "31457280"),
            Self::new("cpu", "cpu.cfs_quota_us", "50000"),
        ]
    }
}

impl fmt::Display for CgroupLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}={}", self.subsystem, self.control_file, self.value)
    }
}

/// How a process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exited normally with the given code.
    Code(i32),
    /// Killed by the given signal number.
    Signal(i32),
}

impl ExitStatus {
    /// Returns whether the process exited with code zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }

    /// Returns the status as a shell-style exit code.
    ///
    /// Signal deaths are reported as `128 + signal`.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Code(code) => code,
            Self::Signal(signal) => crate::constants::SIGNAL_EXIT_OFFSET + signal,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Code(code),
            (None, Some(signal)) => Self::Signal(signal),
            (None, None) => Self::Code(-1),
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}
