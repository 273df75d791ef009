//! Configuration view and validation commands: `mingle config`.

use anyhow::Result;

use mingle::mingle_config::{MingleConfig, MingleToml, SECRET_ENV};

use super::super::ConfigCommands;

pub fn cmd_config(config: &MingleConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Mingle Configuration");
            println!("====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No mingle.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let toml = &config.toml;
            println!("[storage]");
            println!("  db_path = \"{}\"", toml.storage.db_path.display());
            println!();
            println!("[security]");
            let secret = if toml.security.history_secret.is_some() {
                "(set)"
            } else {
                "(not set)"
            };
            println!("  history_secret = {}", secret);
            println!();
            println!("[logging]");
            println!(
                "  level = \"{}\"",
                toml.logging.level.as_deref().unwrap_or("warn")
            );
            println!();

            println!("Effective values (with env overrides):");
            println!("  database = {}", config.db_path().display());
            let source = if std::env::var(SECRET_ENV).is_ok_and(|s| !s.is_empty()) {
                SECRET_ENV
            } else if toml.security.history_secret.is_some() {
                "mingle.toml"
            } else {
                "development default"
            };
            println!("  history_secret from {}", source);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("mingle.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.config_dir.exists() {
                std::fs::create_dir_all(&config.config_dir)?;
            }
            MingleToml::default().save(&config_path)?;

            println!("Created mingle.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [storage] db_path");
            println!("  - [security] history_secret");
            println!("  - [logging] level");
            println!();
        }
    }

    Ok(())
}
