//! Linux namespace management for container isolation.
//!
//! The namespaces are requested atomically through `clone(2)` flags; the
//! submodules cover what has to happen around that call.

pub mod mount;
pub mod user;
pub mod uts;

use nix::sched::CloneFlags;

/// Which namespaces a new process is cloned into.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceRequest {
    /// Isolate the user namespace.
    pub user: bool,
    /// Isolate the UTS (hostname) namespace.
    pub uts: bool,
    /// Isolate the mount namespace.
    pub mount: bool,
    /// Isolate the PID namespace.
    pub pid: bool,
    /// Unshare the mount namespace again after the clone and mark every
    /// mount private, so nothing the child mounts reaches the host.
    pub private_mounts: bool,
}

impl NamespaceRequest {
    /// The request used for a container: user, UTS, mount, and PID
    /// namespaces with private mount propagation.
    #[must_use]
    pub const fn container() -> Self {
        Self {
            user: true,
            uts: true,
            mount: true,
            pid: true,
            private_mounts: true,
        }
    }

    /// Flags passed to `clone(2)`.
    #[must_use]
    pub fn clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();
        flags.set(CloneFlags::CLONE_NEWUSER, self.user);
        flags.set(CloneFlags::CLONE_NEWUTS, self.uts);
        flags.set(CloneFlags::CLONE_NEWNS, self.mount);
        flags.set(CloneFlags::CLONE_NEWPID, self.pid);
        flags
    }

    /// Flags passed to `unshare(2)` in the child before it execs.
    #[must_use]
    pub fn unshare_flags(&self) -> CloneFlags {
        if self.private_mounts {
            CloneFlags::CLONE_NEWNS
        } else {
            CloneFlags::empty()
        }
    }
}

impl Default for NamespaceRequest {
    fn default() -> Self {
        Self::container()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_request_clones_four_namespaces() {
        let flags = NamespaceRequest::container().clone_flags();
        assert_eq!(
            flags,
            CloneFlags::CLONE_NEWUSER
                | CloneFlags::CLONE_NEWUTS
                | CloneFlags::CLONE_NEWNS
                | CloneFlags::CLONE_NEWPID
        );
        assert!(!flags.contains(CloneFlags::CLONE_NEWNET));
    }

    #[test]
    fn container_request_unshares_mounts() {
        assert_eq!(
            NamespaceRequest::container().unshare_flags(),
            CloneFlags::CLONE_NEWNS
        );
    }

    #[test]
    fn disabled_namespaces_are_left_out() {
        let request = NamespaceRequest {
            pid: false,
            private_mounts: false,
            ..NamespaceRequest::container()
        };
        assert!(!request.clone_flags().contains(CloneFlags::CLONE_NEWPID));
        assert!(request.unshare_flags().is_empty());
    }
}
