//! Command-line interface module.
//!
//! Provides argument parsing and headless profile management commands.

pub mod args;
pub mod commands;
