//! CLI interface for dsprobe
//!
//! This crate provides the command-line interface for dsprobe,
//! including argument parsing and the interactive shell.

pub mod args;
pub mod shell;

pub use args::{check_network, Cli, Commands, RunArgs};
pub use shell::{attack_table, execute_interruptible, Command, CommandParser, Shell};
