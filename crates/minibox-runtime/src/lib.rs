//! Launcher and bootstrapper for the minibox container.
//!
//! The launcher re-executes the current binary into fresh namespaces
//! through a [`process::Handoff`]; the re-executed bootstrapper finishes the
//! isolation from the inside with a [`container::Bootstrapper`] and runs the
//! target command.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod exec;
pub mod host;
pub mod launcher;
pub mod process;
