//! Saving, promoting, demoting and deleting favorites.
//!
//! Names are unique within a scope: team favorites and tabs share one
//! namespace, personal favorites one per user.

use crate::auth::Action;
use crate::errors::TabError;
use crate::project::models::{
    Favoritable, Favorite, FavoriteScope, PageRef, Project, User,
};
use crate::view::ViewParams;

use super::{PredefinedTab, TabManager};

impl TabManager<'_> {
    /// Favorites visible to `user`: team favorites and tabs plus the user's
    /// own personal favorites.
    pub fn list_favorites(
        &self,
        user: &User,
        project: &Project,
    ) -> Result<Vec<Favorite>, TabError> {
        self.authorizer.authorize(user, Action::ViewProject, project)?;
        let favorites = self
            .db
            .list_favorites(project.id)
            .map_err(TabError::Store)?;
        Ok(favorites
            .into_iter()
            .filter(|f| f.user_id.is_none() || f.user_id == Some(user.id))
            .collect())
    }

    fn find_in_scope(
        &self,
        project: &Project,
        name: &str,
        user_id: Option<i64>,
    ) -> Result<Option<Favorite>, TabError> {
        let favorites = self
            .db
            .list_favorites(project.id)
            .map_err(TabError::Store)?;
        Ok(favorites
            .into_iter()
            .find(|f| f.user_id == user_id && f.name == name))
    }

    fn owned_favorite(
        &self,
        project: &Project,
        user: &User,
        id: i64,
    ) -> Result<Favorite, TabError> {
        self.db
            .get_favorite(id)
            .map_err(TabError::Store)?
            .filter(|f| f.project_id == project.id)
            .filter(|f| f.user_id.is_none() || f.user_id == Some(user.id))
            .ok_or(TabError::FavoriteNotFound { id })
    }

    /// Save `view` under `name`. Saving over an existing view favorite of
    /// the same scope replaces its view.
    pub fn save_view_favorite(
        &self,
        user: &User,
        project: &Project,
        name: &str,
        view: &ViewParams,
        personal: bool,
    ) -> Result<Favorite, TabError> {
        let action = if personal {
            Action::SavePersonalFavorite
        } else {
            Action::ManageTeamFavorites
        };
        self.authorizer.authorize(user, action, project)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(TabError::BlankName);
        }
        let user_id = personal.then_some(user.id);
        let favorited = Favoritable::View(Box::new(view.clone()));

        if let Some(existing) = self.find_in_scope(project, name, user_id)? {
            if existing.page().is_some() {
                return Err(TabError::NameTaken {
                    name: name.to_string(),
                });
            }
            if existing.scope() == FavoriteScope::TeamTab {
                self.authorizer.authorize(user, Action::ManageTabs, project)?;
            }
            tracing::info!(project = %project.identifier, name, id = existing.id, "Updated view favorite");
            return self
                .db
                .update_favorite_target(existing.id, &favorited)
                .map_err(TabError::Store);
        }

        if !personal && PredefinedTab::from_name(name).is_some() {
            return Err(TabError::NameTaken {
                name: name.to_string(),
            });
        }
        let favorite = self
            .db
            .create_favorite(project.id, name, &favorited, false, user_id)
            .map_err(TabError::Store)?;
        tracing::info!(
            project = %project.identifier,
            name,
            id = favorite.id,
            scope = %favorite.scope(),
            "Saved view favorite"
        );
        Ok(favorite)
    }

    /// Add a team favorite for a wiki page, optionally as a tab. Favoriting
    /// the same page again returns the existing favorite.
    pub fn favorite_page(
        &self,
        user: &User,
        project: &Project,
        page_identifier: &str,
        as_tab: bool,
    ) -> Result<Favorite, TabError> {
        self.authorizer
            .authorize(user, Action::ManageTeamFavorites, project)?;
        if as_tab {
            self.authorizer.authorize(user, Action::ManageTabs, project)?;
        }

        let page = self
            .db
            .find_page(project.id, page_identifier)
            .map_err(TabError::Store)?
            .ok_or_else(|| TabError::PageNotFound {
                identifier: page_identifier.to_string(),
            })?;

        let existing = self
            .db
            .list_favorites(project.id)
            .map_err(TabError::Store)?
            .into_iter()
            .find(|f| f.user_id.is_none() && f.page().is_some_and(|p| p.page_id == page.id));
        let favorite = match existing {
            Some(favorite) => favorite,
            None => {
                if self.find_in_scope(project, &page.name, None)?.is_some() {
                    return Err(TabError::NameTaken { name: page.name });
                }
                let favorited = Favoritable::Page(PageRef {
                    page_id: page.id,
                    identifier: page.identifier.clone(),
                });
                self.db
                    .create_favorite(project.id, &page.name, &favorited, false, None)
                    .map_err(TabError::Store)?
            }
        };

        if as_tab && !favorite.tab_view {
            return self.promote(user, project, favorite.id);
        }
        Ok(favorite)
    }

    /// Turn a team favorite into a tab.
    pub fn promote(
        &self,
        user: &User,
        project: &Project,
        favorite_id: i64,
    ) -> Result<Favorite, TabError> {
        self.authorizer.authorize(user, Action::ManageTabs, project)?;
        let favorite = self.owned_favorite(project, user, favorite_id)?;
        if favorite.user_id.is_some() {
            return Err(TabError::FavoriteNotFound { id: favorite_id });
        }
        if favorite.tab_view {
            return Ok(favorite);
        }

        let tabs = self.display_tabs(project)?;
        if tabs.name_taken(&favorite.name, &favorite.tab_identifier()) {
            return Err(TabError::NameTaken {
                name: favorite.name.clone(),
            });
        }
        let promoted = self
            .db
            .set_tab_view(favorite.id, project.id, true, None)
            .map_err(TabError::Store)?;
        tracing::info!(project = %project.identifier, name = %promoted.name, "Promoted favorite to tab");
        Ok(promoted)
    }

    /// Turn a user tab back into a team favorite, dropping it from the
    /// stored tab ordering.
    pub fn demote(
        &self,
        user: &User,
        project: &Project,
        identifier: &str,
    ) -> Result<Favorite, TabError> {
        self.authorizer.authorize(user, Action::ManageTabs, project)?;
        let tabs = self.display_tabs(project)?;
        let tab = tabs
            .find_by_identifier(identifier)
            .ok_or_else(|| TabError::UnknownIdentifier {
                identifier: identifier.to_string(),
            })?;
        let favorite_id = tab.favorite_id().ok_or_else(|| TabError::Predefined {
            name: tab.name.clone(),
        })?;

        let pruned = tabs.pruned_order(identifier);
        let demoted = self
            .db
            .set_tab_view(favorite_id, project.id, false, pruned.as_deref())
            .map_err(TabError::Store)?;
        tracing::info!(project = %project.identifier, name = %demoted.name, "Demoted tab to favorite");
        Ok(demoted)
    }

    /// Delete a favorite or tab. Personal favorites can only be deleted by
    /// their owner.
    pub fn destroy_favorite(
        &self,
        user: &User,
        project: &Project,
        favorite_id: i64,
    ) -> Result<(), TabError> {
        let favorite = self.owned_favorite(project, user, favorite_id)?;
        match favorite.scope() {
            FavoriteScope::PersonalFavorite => {
                self.authorizer
                    .authorize(user, Action::SavePersonalFavorite, project)?;
            }
            FavoriteScope::TeamFavorite => {
                self.authorizer
                    .authorize(user, Action::ManageTeamFavorites, project)?;
            }
            FavoriteScope::TeamTab => {
                self.authorizer.authorize(user, Action::ManageTabs, project)?;
            }
        }

        let tabs = self.display_tabs(project)?;
        let pruned = tabs.pruned_order(&favorite.tab_identifier());
        self.db
            .delete_favorite(favorite.id, project.id, pruned.as_deref())
            .map_err(TabError::Store)?;
        tracing::info!(project = %project.identifier, name = %favorite.name, "Deleted favorite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleAuthorizer;
    use crate::project::MingleDb;
    use crate::project::models::{ProjectRole, ProjectSchema};
    use anyhow::Result;

    struct Fixture {
        db: MingleDb,
        project: Project,
        admin: User,
        member: User,
    }

    fn fixture() -> Result<Fixture> {
        let db = MingleDb::new_in_memory()?;
        let project = db.create_project("p", "P", &ProjectSchema::default())?;
        let admin = db.upsert_user("admin", "Admin", ProjectRole::Admin)?;
        let member = db.upsert_user("bob", "Bob", ProjectRole::TeamMember)?;
        Ok(Fixture {
            db,
            project,
            admin,
            member,
        })
    }

    fn tagged(tag: &str) -> ViewParams {
        ViewParams {
            tagged_with: [tag.to_string()].into_iter().collect(),
            ..ViewParams::default()
        }
    }

    #[test]
    fn save_view_favorite_upserts_within_scope() -> Result<()> {
        let f = fixture()?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);

        let first = manager.save_view_favorite(&f.member, &f.project, "Bugs", &tagged("a"), false)?;
        let second =
            manager.save_view_favorite(&f.member, &f.project, "Bugs", &tagged("b"), false)?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.view(), Some(&tagged("b")));

        let personal =
            manager.save_view_favorite(&f.member, &f.project, "Bugs", &tagged("c"), true)?;
        assert_ne!(personal.id, first.id);
        assert_eq!(personal.scope(), FavoriteScope::PersonalFavorite);
        assert_eq!(manager.list_favorites(&f.member, &f.project)?.len(), 2);
        assert_eq!(manager.list_favorites(&f.admin, &f.project)?.len(), 1);
        Ok(())
    }

    #[test]
    fn team_favorite_cannot_take_predefined_name() -> Result<()> {
        let f = fixture()?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let err = manager
            .save_view_favorite(&f.member, &f.project, "History", &tagged("a"), false)
            .unwrap_err();
        assert!(matches!(err, TabError::NameTaken { .. }));
        assert!(matches!(
            manager.save_view_favorite(&f.member, &f.project, " ", &tagged("a"), false),
            Err(TabError::BlankName)
        ));
        Ok(())
    }

    #[test]
    fn promote_and_demote_round_trip_through_tab_bar() -> Result<()> {
        let f = fixture()?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let fav = manager.save_view_favorite(&f.member, &f.project, "Bugs", &tagged("a"), false)?;

        assert!(matches!(
            manager.promote(&f.member, &f.project, fav.id),
            Err(TabError::Access(_))
        ));
        let tab = manager.promote(&f.admin, &f.project, fav.id)?;
        assert!(tab.tab_view);
        manager.reorder(&f.admin, &f.project, &[tab.tab_identifier(), "All".into()])?;
        assert_eq!(manager.display_tabs(&f.project)?.names()[0], "Bugs");

        let demoted = manager.demote(&f.admin, &f.project, &tab.tab_identifier())?;
        assert!(!demoted.tab_view);
        assert_eq!(f.db.get_tab_order(f.project.id)?, Some(vec!["All".to_string()]));
        assert!(matches!(
            manager.demote(&f.admin, &f.project, "History"),
            Err(TabError::Predefined { .. })
        ));
        Ok(())
    }

    #[test]
    fn personal_favorites_cannot_become_tabs() -> Result<()> {
        let f = fixture()?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let fav = manager.save_view_favorite(&f.admin, &f.project, "Mine", &tagged("a"), true)?;
        assert!(matches!(
            manager.promote(&f.admin, &f.project, fav.id),
            Err(TabError::FavoriteNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn favorite_page_is_idempotent_and_can_be_a_tab() -> Result<()> {
        let f = fixture()?;
        f.db.create_page(f.project.id, "Road Map", "")?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);

        let fav = manager.favorite_page(&f.member, &f.project, "Road_Map", false)?;
        let again = manager.favorite_page(&f.admin, &f.project, "Road_Map", true)?;
        assert_eq!(fav.id, again.id);
        assert!(again.tab_view);
        assert!(manager.display_tabs(&f.project)?.find_by_name("Road Map").is_some());

        assert!(matches!(
            manager.favorite_page(&f.member, &f.project, "Missing", false),
            Err(TabError::PageNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn destroy_favorite_prunes_tab_order_and_respects_ownership() -> Result<()> {
        let f = fixture()?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let fav = manager.save_view_favorite(&f.admin, &f.project, "Bugs", &tagged("a"), false)?;
        let tab = manager.promote(&f.admin, &f.project, fav.id)?;
        manager.reorder(&f.admin, &f.project, &["History".into(), tab.tab_identifier()])?;

        assert!(matches!(
            manager.destroy_favorite(&f.member, &f.project, tab.id),
            Err(TabError::Access(_))
        ));
        manager.destroy_favorite(&f.admin, &f.project, tab.id)?;
        assert_eq!(f.db.get_tab_order(f.project.id)?, Some(vec!["History".to_string()]));

        let mine = manager.save_view_favorite(&f.member, &f.project, "Mine", &tagged("a"), true)?;
        assert!(matches!(
            manager.destroy_favorite(&f.admin, &f.project, mine.id),
            Err(TabError::FavoriteNotFound { .. })
        ));
        manager.destroy_favorite(&f.member, &f.project, mine.id)?;
        assert!(f.db.get_favorite(mine.id)?.is_none());
        Ok(())
    }
}
