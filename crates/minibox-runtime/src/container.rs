//! The in-container bootstrap sequence.
//!
//! Runs as the re-executed process, already inside the new namespaces:
//! hostname, cgroup limits, root switch, `/proc`, target command, teardown.
//! Steps before the target command are all-or-nothing; teardown always runs
//! and tries every unmount.

use std::fmt;

use minibox_common::config::ContainerConfig;
use minibox_common::constants::PROC_PATH;
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ExitStatus;
use minibox_core::cgroup::CgroupManager;
use minibox_core::filesystem::mount::{MountRecord, MountStack};
use nix::unistd::getpid;

use crate::host::{Host, LinuxHost};

/// A step of the bootstrap sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Set the container hostname.
    Init,
    /// Apply cgroup limits and bind-mount the groups into the root.
    Limit,
    /// Switch to the container root.
    IsolateFs,
    /// Mount a private `/proc`.
    MountProc,
    /// Run the target command.
    Exec,
    /// Unmount everything mounted above.
    Teardown,
}

impl Stage {
    /// Stable name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Limit => "limit",
            Self::IsolateFs => "isolate-fs",
            Self::MountProc => "mount-proc",
            Self::Exec => "exec",
            Self::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Finishes isolation from inside the namespaces and runs one command.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    config: ContainerConfig,
    command: Vec<String>,
}

impl Bootstrapper {
    /// Creates a bootstrapper for `command` under `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Config`] if `command` is empty or `config`
    /// fails validation.
    pub fn new(config: ContainerConfig, command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(MiniboxError::Config {
                message: "no command given".into(),
            });
        }
        config.validate()?;
        Ok(Self { config, command })
    }

    /// The command that runs once isolation is complete.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Runs the whole sequence against the running kernel and returns the
    /// target's exit status.
    ///
    /// # Errors
    ///
    /// See [`run_on`](Self::run_on).
    pub fn run(&self) -> Result<ExitStatus> {
        self.run_on(&mut LinuxHost)
    }

    /// Runs the whole sequence through `host`.
    ///
    /// # Errors
    ///
    /// - A setup failure is returned wrapped in [`MiniboxError::Stage`]; the
    ///   target never runs and mounts made so far are unwound.
    /// - A failure to start the target is returned after teardown.
    /// - An unmount failure outranks the target's status.
    pub fn run_on<H: Host>(&self, host: &mut H) -> Result<ExitStatus> {
        let mut mounts = MountStack::new();
        if let Err(e) = self.prepare(host, &mut mounts) {
            // Unmount failures were logged by unwind_with; the setup error wins.
            let _ = mounts.unwind_with(|r| host.unmount(r));
            return Err(e);
        }

        tracing::info!(pid = %getpid(), "running container");
        let status = host.run_target(&self.command);

        let mounted = mounts.len();
        mounts
            .unwind_with(|r| host.unmount(r))
            .map_err(|e| e.in_stage(Stage::Teardown.name()))?;
        tracing::info!(unmounted = mounted, "container torn down");

        status.map_err(|e| e.in_stage(Stage::Exec.name()))
    }

    /// Stages 1 through 4.
    fn prepare<H: Host>(&self, host: &mut H, mounts: &mut MountStack) -> Result<()> {
        run_stage(Stage::Init, || host.set_hostname(&self.config.hostname))?;

        run_stage(Stage::Limit, || {
            let cgroups = CgroupManager::new(&self.config);
            host.apply_limits(&cgroups, getpid())?;
            for record in cgroups.bind_records() {
                mounts.mount_with(record, |r| host.mount(r))?;
            }
            Ok(())
        })?;

        run_stage(Stage::IsolateFs, || {
            host.change_root(&self.config.rootfs)?;
            // Host paths stop resolving as soon as the root changes.
            mounts.rebase(&self.config.rootfs);
            host.enter_root()
        })?;

        run_stage(Stage::MountProc, || {
            mounts.mount_with(MountRecord::proc(PROC_PATH), |r| host.mount(r))
        })
    }
}

fn run_stage<F>(stage: Stage, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    tracing::debug!(%stage, "entering stage");
    f().map_err(|e| e.in_stage(stage.name()))
}
