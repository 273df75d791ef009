//! Tab and favorite commands: `mingle tabs`, `mingle favorites`.
//!
//! Renaming or removing a tab also updates the session's card navigation
//! state so the old tab name stops resolving.

use anyhow::Result;

use mingle::auth::RoleAuthorizer;
use mingle::context::SessionStore;
use mingle::mingle_config::MingleConfig;
use mingle::project::models::Favoritable;
use mingle::tabs::{TabKind, TabManager};
use mingle::view::{SimpleMql, ViewParams};

use super::super::{Cli, FavoritesCommands, TabsCommands};
use super::{Workspace, open_workspace};

pub fn cmd_tabs(config: &MingleConfig, cli: &Cli, command: TabsCommands) -> Result<()> {
    let ws = open_workspace(config, cli)?;
    let manager = TabManager::new(&ws.db, &RoleAuthorizer);

    match command {
        TabsCommands::List => {
            let tabs = manager.display_tabs(&ws.project)?;
            for tab in tabs.tabs() {
                let kind = match &tab.kind {
                    TabKind::Predefined(_) => "predefined",
                    TabKind::View { .. } => "view",
                    TabKind::Page { .. } => "page",
                };
                println!("{:<14} {:<24} {}", tab.identifier, tab.name, kind);
            }
        }
        TabsCommands::Rename { identifier, name } => {
            let old_name = manager
                .display_tabs(&ws.project)?
                .find_by_identifier(&identifier)
                .map(|t| t.name.clone());
            let tab = manager.rename(&ws.user, &ws.project, &identifier, &name)?;
            if let Some(old_name) = old_name {
                update_session(&ws, &cli.session, |ctx| ctx.rename_tab(&old_name, &tab.name))?;
            }
            println!("Renamed tab {} to {}", identifier, tab.name);
        }
        TabsCommands::Reorder { identifiers } => {
            let tabs = manager.reorder(&ws.user, &ws.project, &identifiers)?;
            println!("Tabs: {}", tabs.names().join(", "));
        }
        TabsCommands::Promote { favorite_id } => {
            let favorite = manager.promote(&ws.user, &ws.project, favorite_id)?;
            println!("Promoted {} to a tab ({})", favorite.name, favorite.tab_identifier());
        }
        TabsCommands::Demote { identifier } => {
            let favorite = manager.demote(&ws.user, &ws.project, &identifier)?;
            update_session(&ws, &cli.session, |ctx| ctx.forget_tab(&favorite.name))?;
            println!("Demoted tab {} to a team favorite", favorite.name);
        }
    }
    Ok(())
}

pub fn cmd_favorites(config: &MingleConfig, cli: &Cli, command: FavoritesCommands) -> Result<()> {
    let ws = open_workspace(config, cli)?;
    let manager = TabManager::new(&ws.db, &RoleAuthorizer);

    match command {
        FavoritesCommands::List => {
            for favorite in manager.list_favorites(&ws.user, &ws.project)? {
                let target = match &favorite.favorited {
                    Favoritable::View(view) => view.to_query(),
                    Favoritable::Page(page) => format!("page {}", page.identifier),
                };
                println!(
                    "{:<4} {:<24} {:<18} {}",
                    favorite.id,
                    favorite.name,
                    favorite.scope(),
                    target
                );
            }
        }
        FavoritesCommands::Save {
            name,
            query,
            personal,
        } => {
            let view = ViewParams::from_query(&ws.project, &query, &SimpleMql)?;
            let favorite =
                manager.save_view_favorite(&ws.user, &ws.project, &name, &view, personal)?;
            println!("Saved {} {} (id {})", favorite.scope(), favorite.name, favorite.id);
        }
        FavoritesCommands::Page { identifier, tab } => {
            let favorite = manager.favorite_page(&ws.user, &ws.project, &identifier, tab)?;
            println!("Saved {} {} (id {})", favorite.scope(), favorite.name, favorite.id);
        }
        FavoritesCommands::Delete { id } => {
            let name = ws.db.get_favorite(id)?.map(|f| f.name);
            manager.destroy_favorite(&ws.user, &ws.project, id)?;
            if let Some(name) = name {
                update_session(&ws, &cli.session, |ctx| ctx.forget_tab(&name))?;
            }
            println!("Deleted favorite {}", id);
        }
    }
    Ok(())
}

fn update_session(
    ws: &Workspace,
    session_id: &str,
    change: impl FnOnce(&mut mingle::context::CardContext),
) -> Result<()> {
    let Some(mut context) = ws.db.load(session_id, ws.project.id)? else {
        return Ok(());
    };
    change(&mut context);
    ws.db.save(session_id, ws.project.id, &context)
}
