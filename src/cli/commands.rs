//! Headless CLI command handlers for profile management.

use color_eyre::eyre::{bail, Result};

use crate::cli::args::Commands;
use crate::state::{ConnectionProfile, ProfileStore};

/// Execute a CLI subcommand against the default profile store.
pub fn run(command: Commands) -> Result<()> {
    let mut store = ProfileStore::open_default()?;

    match command {
        Commands::Add {
            name,
            config,
            username,
            password,
        } => {
            if name.trim().is_empty() {
                bail!("profile name must not be empty");
            }
            if !config.is_file() {
                bail!("configuration file not found: {}", config.display());
            }
            if username.is_some() != password.is_some() {
                bail!("--username and --password must be given together");
            }
            let profile = ConnectionProfile {
                name: name.clone(),
                config_path: config,
                username,
                password,
            };
            store.add(profile)?;
            println!("Saved profile '{name}'.");
        }
        Commands::Remove { name } => {
            if store.remove(&name)? {
                println!("Removed profile '{name}'.");
            } else {
                bail!("no profile named '{name}'");
            }
        }
        Commands::List => {
            if store.is_empty() {
                println!("No profiles saved. Add one with 'tunpilot add <name> <config.ovpn>'.");
            } else {
                for profile in store.all() {
                    let auth = if profile.has_credentials() {
                        format!(" (user: {})", profile.username.as_deref().unwrap_or(""))
                    } else {
                        String::new()
                    };
                    println!(
                        "{:<20} {}{auth}",
                        profile.name,
                        profile.config_path.display()
                    );
                }
            }
        }
    }
    Ok(())
}
