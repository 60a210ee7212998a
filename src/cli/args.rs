//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tunpilot - terminal front-end for supervising a local OpenVPN client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Subcommand to execute; without one the dashboard starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add or replace a connection profile
    Add {
        /// Unique profile name
        name: String,
        /// Path to the .ovpn configuration file
        config: PathBuf,
        /// Username for servers requiring auth-user-pass
        #[arg(long)]
        username: Option<String>,
        /// Password for servers requiring auth-user-pass (stored in cleartext)
        #[arg(long)]
        password: Option<String>,
    },
    /// Remove a profile by name
    Remove {
        /// Profile name to remove
        name: String,
    },
    /// List saved profiles
    List,
}
