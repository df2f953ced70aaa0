//! Host operations the bootstrap sequence performs.
//!
//! The [`Bootstrapper`](crate::container::Bootstrapper) decides the order;
//! a [`Host`] carries out each step. [`LinuxHost`] issues the real
//! syscalls.

use std::path::Path;

use minibox_common::error::Result;
use minibox_common::types::ExitStatus;
use minibox_core::cgroup::CgroupManager;
use minibox_core::filesystem::chroot;
use minibox_core::filesystem::mount::{MountRecord, mount_record, unmount_record};
use minibox_core::namespace::uts;
use nix::unistd::Pid;

/// Kernel-facing steps of the bootstrap sequence.
pub trait Host {
    /// Sets the UTS hostname.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname is rejected.
    fn set_hostname(&mut self, hostname: &str) -> Result<()>;

    /// Writes every limit of `cgroups` and moves `pid` into its groups.
    ///
    /// # Errors
    ///
    /// Returns an error for the first control file write that fails.
    fn apply_limits(&mut self, cgroups: &CgroupManager, pid: Pid) -> Result<()>;

    /// Performs one mount.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn mount(&mut self, record: &MountRecord) -> Result<()>;

    /// Changes the process root to `new_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be changed.
    fn change_root(&mut self, new_root: &Path) -> Result<()>;

    /// Moves the working directory to the current root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be changed.
    fn enter_root(&mut self) -> Result<()>;

    /// Runs the target command to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started.
    fn run_target(&mut self, command: &[String]) -> Result<ExitStatus>;

    /// Detaches one mount.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount fails.
    fn unmount(&mut self, record: &MountRecord) -> Result<()>;
}

/// The running kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxHost;

impl Host for LinuxHost {
    fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        uts::set_hostname(hostname)
    }

    fn apply_limits(&mut self, cgroups: &CgroupManager, pid: Pid) -> Result<()> {
        cgroups.apply_limits(pid)
    }

    fn mount(&mut self, record: &MountRecord) -> Result<()> {
        mount_record(record)
    }

    fn change_root(&mut self, new_root: &Path) -> Result<()> {
        chroot::change_root(new_root)
    }

    fn enter_root(&mut self) -> Result<()> {
        chroot::enter_root()
    }

    fn run_target(&mut self, command: &[String]) -> Result<ExitStatus> {
        crate::exec::run_target(command)
    }

    fn unmount(&mut self, record: &MountRecord) -> Result<()> {
        unmount_record(record)
    }
}
