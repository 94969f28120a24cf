//! Configuration profiles for the restic backup tool.
//!
//! A configuration file declares named profiles (repository, flags per
//! command, hooks, retention and check policy) that may inherit from each
//! other, plus groups of profiles run one after the other.
//!
//! - **[`config`]**: load the file, resolve profiles and derive restic flags
//! - **[`orchestrator`]**: run one profile through its lifecycle
//! - **[`exec`]**: start external commands, honouring dry-run and interrupts
//! - **[`commands`]**: top-level command handlers behind the [`cli`]
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod lock;
pub mod logging;
pub mod orchestrator;
pub mod platform;
pub mod status;
