//! # minibox-common
//!
//! Shared error taxonomy, configuration model, and constants used by
//! every crate in the minibox workspace.
//!
//! This crate is the leaf of the dependency graph: it performs no
//! syscalls and depends on no other internal crate.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
