//! CLI module for remindr - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the
//! reminder daemon and inspecting schedules and habit stats.

pub mod commands;

pub use commands::Cli;
