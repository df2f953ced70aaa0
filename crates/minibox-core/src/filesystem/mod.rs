//! Filesystem management for container isolation.
//!
//! Provides the `chroot` root switch and the reverse-unwinding mount stack.

pub mod chroot;
pub mod mount;
