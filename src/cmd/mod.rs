//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                   |
//! |-----------|------------------------------------|
//! | `project` | `Init`, `Project`                  |
//! | `config`  | `Config`                           |
//! | `cards`   | `View`, `Cards`                    |
//! | `tabs`    | `Tabs`, `Favorites`                |
//! | `history` | `History`                          |

pub mod cards;
pub mod config;
pub mod history;
pub mod project;
pub mod tabs;

pub use cards::{cmd_cards, cmd_view};
pub use config::cmd_config;
pub use history::cmd_history;
pub use project::{cmd_init, cmd_project};
pub use tabs::{cmd_favorites, cmd_tabs};

use anyhow::{Context, Result};

use mingle::mingle_config::MingleConfig;
use mingle::project::MingleDb;
use mingle::project::models::{Project, ProjectRole, User};

use super::Cli;

/// Login used when `--user` is not given.
const LOCAL_ADMIN: &str = "admin";

/// Open database plus the project and user a command acts on.
pub struct Workspace {
    pub db: MingleDb,
    pub project: Project,
    pub user: User,
}

pub fn open_db(config: &MingleConfig) -> Result<MingleDb> {
    let path = config.db_path();
    tracing::debug!(path = %path.display(), "Opening database");
    MingleDb::new(&path)
}

pub fn open_workspace(config: &MingleConfig, cli: &Cli) -> Result<Workspace> {
    let db = open_db(config)?;
    let identifier = cli
        .project
        .as_deref()
        .context("No project given; pass --project <identifier>")?;
    let project = db
        .find_project(identifier)?
        .with_context(|| format!("Project {} does not exist", identifier))?;

    let user = match cli.user.as_deref() {
        Some(login) => db
            .find_user(login)?
            .with_context(|| format!("User {} does not exist", login))?,
        None => match db.find_user(LOCAL_ADMIN)? {
            Some(user) => user,
            None => db.upsert_user(LOCAL_ADMIN, "Administrator", ProjectRole::Admin)?,
        },
    };

    Ok(Workspace { db, project, user })
}
