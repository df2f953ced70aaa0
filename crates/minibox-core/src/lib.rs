//! # minibox-core
//!
//! Low-level Linux isolation primitives for the minibox bootstrapper.
//!
//! This crate provides safe wrappers over:
//! - **Namespaces**: the clone-time namespace request, UID/GID identity
//!   maps, hostname isolation, and private mount propagation.
//! - **Cgroups v1**: limit writes, process membership, and bind-mounting
//!   the limited controllers into the container root.
//! - **Filesystem**: the `chroot` root switch and a mount stack that
//!   unwinds in reverse order.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
