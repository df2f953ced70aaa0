//! Re-executing the current binary inside new namespaces.
//!
//! A [`Handoff`] describes "spawn myself with capability set C": the
//! namespaces to clone into, the identity maps the parent writes for the
//! child, the credential the child assumes, and the argument vector that
//! selects the bootstrapper role. PID namespace membership only applies to
//! processes born after the clone, which is why the child execs a fresh
//! image instead of continuing in this one.
//!
//! The parent and the clone child synchronise over two close-on-exec pipes:
//! the parent writes one byte on `sync` once the identity maps are in
//! place, and the child reports any pre-exec failure on `report`. A clean
//! EOF on `report` means the exec succeeded.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use minibox_common::constants::{APP_NAME, SELF_EXE, SUB_VERB};
use minibox_common::error::{MiniboxError, Result};
use minibox_common::types::ExitStatus;
use minibox_core::namespace::NamespaceRequest;
use minibox_core::namespace::mount::make_mounts_private;
use minibox_core::namespace::user::{Credential, IdentityMapping};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::CloneFlags;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

/// Stack handed to the clone child; it only runs until `execv`.
const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Step byte plus native-endian errno.
const REPORT_LEN: usize = 5;

/// Exit code of a clone child that failed before exec.
const PRE_EXEC_FAILURE: isize = 127;

/// Describes a re-execution of the current binary into new namespaces.
#[derive(Debug, Clone)]
pub struct Handoff {
    executable: CString,
    argv: Vec<CString>,
    namespaces: NamespaceRequest,
    identity: IdentityMapping,
    credential: Credential,
}

impl Handoff {
    /// The handoff into the bootstrapper role: user, UTS, mount, and PID
    /// namespaces; container root mapped to the invoking user; UID/GID 0
    /// inside; and `sub <command...>` as the argument vector.
    ///
    /// `config_path` is forwarded so the bootstrapper reads the same
    /// configuration as the launcher.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Spawn`] if an argument contains a NUL byte.
    pub fn bootstrap(command: &[String], config_path: Option<&Path>) -> Result<Self> {
        let mut args: Vec<String> = vec![APP_NAME.to_string()];
        if let Some(path) = config_path {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args.push(SUB_VERB.to_string());
        args.extend(command.iter().cloned());

        let to_cstring =
            |s: String| CString::new(s).map_err(|e| spawn_error(std::io::Error::other(e)));
        let argv = args
            .into_iter()
            .map(to_cstring)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            executable: to_cstring(SELF_EXE.to_string())?,
            argv,
            namespaces: NamespaceRequest::container(),
            identity: IdentityMapping::root_to_invoking_user(),
            credential: Credential::root(),
        })
    }

    /// Argument vector of the new process, `argv[0]` included.
    pub fn argv(&self) -> impl Iterator<Item = &CStr> {
        self.argv.iter().map(CString::as_c_str)
    }

    /// Namespaces the child is cloned into.
    #[must_use]
    pub const fn namespaces(&self) -> NamespaceRequest {
        self.namespaces
    }

    /// Identity maps written for the child.
    #[must_use]
    pub const fn identity(&self) -> IdentityMapping {
        self.identity
    }

    /// Credential the child assumes before exec.
    #[must_use]
    pub const fn credential(&self) -> Credential {
        self.credential
    }

    /// Clones the child into the requested namespaces, writes its identity
    /// maps, and waits until it has exec'd.
    ///
    /// The child inherits stdin, stdout, and stderr unchanged.
    ///
    /// # Errors
    ///
    /// - [`MiniboxError::Spawn`] if the clone is rejected or the exec fails.
    /// - [`MiniboxError::Namespace`] if the identity maps, the mount
    ///   unsharing, or the credential switch are rejected.
    pub fn spawn(&self) -> Result<Child> {
        let (sync_read, sync_write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| spawn_error(e.into()))?;
        let (report_read, report_write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)
            .map_err(|e| spawn_error(e.into()))?;

        let fds = ChildFds {
            sync_read: sync_read.as_raw_fd(),
            sync_write: sync_write.as_raw_fd(),
            report_read: report_read.as_raw_fd(),
            report_write: report_write.as_raw_fd(),
        };
        let executable = self.executable.as_c_str();
        let argv = self.argv.as_slice();
        let unshare_flags = self.namespaces.unshare_flags();
        let credential = self.credential;

        let mut stack = vec![0_u8; CHILD_STACK_SIZE];
        let callback = Box::new(move || -> isize {
            match child_main(fds, executable, argv, unshare_flags, credential) {
                Ok(()) => 0,
                Err((step, errno)) => {
                    send_report(fds.report_write, step, errno);
                    PRE_EXEC_FAILURE
                }
            }
        });

        // SAFETY: the launcher is single-threaded when it clones, and the
        // child never returns into Rust code that depends on the parent's
        // state: it only touches the pipes and argument buffers captured
        // above before exec'ing or exiting.
        let pid = unsafe {
            nix::sched::clone(
                callback,
                &mut stack,
                self.namespaces.clone_flags(),
                Some(libc::SIGCHLD),
            )
        }
        .map_err(|e| spawn_error(e.into()))?;
        drop(sync_read);
        drop(report_write);

        let child = Child {
            pid,
            program: SELF_EXE.to_string(),
        };
        tracing::debug!(%pid, flags = ?self.namespaces.clone_flags(), "cloned bootstrapper");

        if let Err(e) = self.identity.apply(pid) {
            child.abort();
            return Err(e);
        }
        if let Err(e) = File::from(sync_write).write_all(&[1]) {
            child.abort();
            return Err(spawn_error(e));
        }

        let mut report = Vec::with_capacity(REPORT_LEN);
        if let Err(e) = File::from(report_read).read_to_end(&mut report) {
            child.abort();
            return Err(spawn_error(e));
        }
        if let Some((step, errno)) = decode_report(&report) {
            child.abort();
            return Err(step.into_error(errno));
        }

        tracing::debug!(%pid, "bootstrapper exec'd");
        Ok(child)
    }
}

/// A running re-executed process.
#[derive(Debug)]
pub struct Child {
    pid: Pid,
    program: String,
}

impl Child {
    /// Host PID of the child.
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// Blocks until the child exits.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Spawn`] if `waitpid(2)` fails.
    pub fn wait(self) -> Result<ExitStatus> {
        loop {
            match waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Code(code)),
                Ok(WaitStatus::Signaled(_, signal, _)) => {
                    return Ok(ExitStatus::Signal(signal as i32));
                }
                Ok(_) | Err(Errno::EINTR) => {}
                Err(e) => {
                    return Err(MiniboxError::Spawn {
                        program: self.program,
                        source: e.into(),
                    });
                }
            }
        }
    }

    /// Kills and reaps a child that failed during the handoff.
    fn abort(self) {
        let _ = kill(self.pid, Signal::SIGKILL);
        let _ = waitpid(self.pid, None);
    }
}

/// Pre-exec steps of the clone child, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ChildStep {
    AwaitMaps = 1,
    PrivateMounts = 2,
    Credential = 3,
    Exec = 4,
}

impl ChildStep {
    const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::AwaitMaps),
            2 => Some(Self::PrivateMounts),
            3 => Some(Self::Credential),
            4 => Some(Self::Exec),
            _ => None,
        }
    }

    fn into_error(self, errno: i32) -> MiniboxError {
        let source = std::io::Error::from_raw_os_error(errno);
        let step = match self {
            Self::AwaitMaps => "wait for identity maps",
            Self::PrivateMounts => "make mounts private",
            Self::Credential => "assume credential",
            Self::Exec => return spawn_error(source),
        };
        MiniboxError::Namespace { step, source }
    }
}

/// Raw pipe ends as seen by the clone child.
#[derive(Debug, Clone, Copy)]
struct ChildFds {
    sync_read: RawFd,
    sync_write: RawFd,
    report_read: RawFd,
    report_write: RawFd,
}

/// Runs in the clone child. Only returns on failure; success ends in exec.
fn child_main(
    fds: ChildFds,
    executable: &CStr,
    argv: &[CString],
    unshare_flags: CloneFlags,
    credential: Credential,
) -> std::result::Result<(), (ChildStep, i32)> {
    // SAFETY: these are the child's copies of the parent's pipe ends.
    unsafe {
        let _ = libc::close(fds.sync_write);
        let _ = libc::close(fds.report_read);
    }

    await_parent(fds.sync_read).map_err(|errno| (ChildStep::AwaitMaps, errno))?;
    make_mounts_private(unshare_flags).map_err(|e| (ChildStep::PrivateMounts, errno_of(&e)))?;
    credential
        .assume()
        .map_err(|e| (ChildStep::Credential, errno_of(&e)))?;

    match nix::unistd::execv(executable, argv) {
        Ok(never) => match never {},
        Err(errno) => Err((ChildStep::Exec, errno as i32)),
    }
}

/// Blocks until the parent writes the go-ahead byte.
fn await_parent(fd: RawFd) -> std::result::Result<(), i32> {
    let mut byte = 0_u8;
    loop {
        // SAFETY: `byte` is a valid one-byte buffer for the duration of the call.
        let n = unsafe { libc::read(fd, (&raw mut byte).cast(), 1) };
        match n {
            1 => return Ok(()),
            0 => return Err(libc::EPIPE),
            _ => {
                let errno = Errno::last_raw();
                if errno != libc::EINTR {
                    return Err(errno);
                }
            }
        }
    }
}

fn send_report(fd: RawFd, step: ChildStep, errno: i32) {
    let report = encode_report(step, errno);
    // SAFETY: `report` outlives the call; a short write is impossible below
    // PIPE_BUF.
    let _ = unsafe { libc::write(fd, report.as_ptr().cast(), report.len()) };
}

fn encode_report(step: ChildStep, errno: i32) -> [u8; REPORT_LEN] {
    let mut report = [0_u8; REPORT_LEN];
    report[0] = step as u8;
    report[1..].copy_from_slice(&errno.to_ne_bytes());
    report
}

fn decode_report(report: &[u8]) -> Option<(ChildStep, i32)> {
    let (&step, errno) = report.split_first()?;
    let errno: [u8; REPORT_LEN - 1] = errno.try_into().ok()?;
    Some((ChildStep::from_byte(step)?, i32::from_ne_bytes(errno)))
}

fn errno_of(err: &MiniboxError) -> i32 {
    err.raw_os_error().unwrap_or(libc::EINVAL)
}

fn spawn_error(source: std::io::Error) -> MiniboxError {
    MiniboxError::Spawn {
        program: SELF_EXE.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use nix::unistd::{Gid, Uid};

    use super::*;

    fn argv_of(handoff: &Handoff) -> Vec<String> {
        handoff
            .argv()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn bootstrap_argv_selects_sub_role_and_keeps_command_verbatim() {
        let command = vec!["/bin/sh".to_string(), "-c".to_string(), "echo $$".to_string()];
        let handoff = Handoff::bootstrap(&command, None).unwrap();

        assert_eq!(argv_of(&handoff), ["minibox", "sub", "/bin/sh", "-c", "echo $$"]);
    }

    #[test]
    fn bootstrap_argv_forwards_config_before_the_verb() {
        let command = vec!["/bin/true".to_string()];
        let config = PathBuf::from("/etc/minibox/box1.json");
        let handoff = Handoff::bootstrap(&command, Some(&config)).unwrap();

        assert_eq!(
            argv_of(&handoff),
            ["minibox", "--config", "/etc/minibox/box1.json", "sub", "/bin/true"]
        );
    }

    #[test]
    fn bootstrap_requests_container_namespaces_and_root_credential() {
        let handoff = Handoff::bootstrap(&["/bin/true".to_string()], None).unwrap();

        assert_eq!(handoff.namespaces(), NamespaceRequest::container());
        assert_eq!(handoff.credential(), Credential::root());
        assert_eq!(
            handoff.identity(),
            IdentityMapping::root_to(Uid::current(), Gid::current())
        );
    }

    #[test]
    fn bootstrap_reexecs_this_binary() {
        let handoff = Handoff::bootstrap(&["/bin/true".to_string()], None).unwrap();
        assert_eq!(handoff.executable.to_str().unwrap(), SELF_EXE);
    }

    #[test]
    fn nul_in_argument_is_a_spawn_error() {
        let err = Handoff::bootstrap(&["/bin/echo".to_string(), "a\0b".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, MiniboxError::Spawn { .. }));
    }

    #[test]
    fn report_decodes_to_step_and_errno() {
        let report = encode_report(ChildStep::Credential, libc::EPERM);
        assert_eq!(
            decode_report(&report),
            Some((ChildStep::Credential, libc::EPERM))
        );
    }

    #[test]
    fn empty_or_garbled_report_means_no_failure() {
        assert_eq!(decode_report(&[]), None);
        assert_eq!(decode_report(&[4, 0, 0]), None);
        assert_eq!(decode_report(&[99, 1, 0, 0, 0]), None);
    }

    #[test]
    fn exec_failure_maps_to_spawn_and_setup_failures_to_namespace() {
        assert!(matches!(
            ChildStep::Exec.into_error(libc::ENOENT),
            MiniboxError::Spawn { .. }
        ));
        assert!(matches!(
            ChildStep::PrivateMounts.into_error(libc::EPERM),
            MiniboxError::Namespace {
                step: "make mounts private",
                ..
            }
        ));
    }
}
