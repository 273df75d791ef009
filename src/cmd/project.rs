//! Initialization and project commands: `mingle init`, `mingle project`.

use anyhow::{Context, Result};

use mingle::mingle_config::{MingleConfig, MingleToml};
use mingle::project::models::ProjectFixture;

use super::super::ProjectCommands;
use super::open_db;

pub fn cmd_init(config: &MingleConfig) -> Result<()> {
    let config_path = config.config_file();
    let created = !config_path.exists();
    if created {
        std::fs::create_dir_all(&config.config_dir)
            .with_context(|| format!("Failed to create {}", config.config_dir.display()))?;
        MingleToml::default().save(&config_path)?;
    }
    open_db(config)?;

    if created {
        println!("Initialized mingle project at {}", config.config_dir.display());
        println!();
        println!("Created:");
        println!("  .mingle/mingle.toml   # storage, security and logging settings");
        println!("  {}", config.db_path().display());
        println!();
        println!("Next steps:");
        println!("  1. Set [security] history_secret in .mingle/mingle.toml");
        println!("  2. Run `mingle project import <file.json>`");
    } else {
        println!(
            "Mingle project already initialized at {}",
            config.config_dir.display()
        );
    }
    Ok(())
}

pub fn cmd_project(config: &MingleConfig, command: ProjectCommands) -> Result<()> {
    let db = open_db(config)?;
    match command {
        ProjectCommands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let fixture: ProjectFixture = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            if db.find_project(&fixture.identifier)?.is_some() {
                anyhow::bail!("Project {} already exists", fixture.identifier);
            }
            let project = db.import_fixture(&fixture)?;
            tracing::info!(project = %project.identifier, cards = fixture.cards.len(), "Imported project");
            println!(
                "Imported project {} ({} cards, {} pages, {} users)",
                project.identifier,
                fixture.cards.len(),
                fixture.pages.len(),
                fixture.users.len()
            );
        }
        ProjectCommands::List => {
            let projects = db.list_projects()?;
            if projects.is_empty() {
                println!("No projects. Run `mingle project import <file.json>`.");
            }
            for project in projects {
                println!("{}  {}", project.identifier, project.name);
            }
        }
    }
    Ok(())
}
