//! Project navigation tabs.
//!
//! Four predefined tabs always exist. Team favorites flagged `tab_view` add
//! user tabs. Without a stored ordering tabs read Overview, All, user tabs
//! (oldest first), Dependencies, History. A stored ordering wins; stale
//! identifiers in it are skipped and tabs it does not mention go before
//! Dependencies.

pub mod favorites;

use anyhow::Result;

use crate::auth::{Action, Authorizer};
use crate::context::ALL_TAB;
use crate::errors::TabError;
use crate::project::MingleDb;
use crate::project::models::{Favoritable, Favorite, FavoriteScope, Page, PageRef, Project, User};
use crate::view::ViewParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedTab {
    Overview,
    All,
    History,
    Dependencies,
}

impl PredefinedTab {
    pub const ALL: [PredefinedTab; 4] = [
        PredefinedTab::Overview,
        PredefinedTab::All,
        PredefinedTab::History,
        PredefinedTab::Dependencies,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::All => ALL_TAB,
            Self::History => "History",
            Self::Dependencies => "Dependencies",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Tabs that stay at the end of the bar unless moved explicitly.
    fn is_trailing(&self) -> bool {
        matches!(self, Self::Dependencies | Self::History)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TabKind {
    Predefined(PredefinedTab),
    View { favorite_id: i64, view: Box<ViewParams> },
    Page { favorite_id: i64, page: PageRef },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTab {
    pub identifier: String,
    pub name: String,
    pub kind: TabKind,
}

impl DisplayTab {
    fn predefined(tab: PredefinedTab) -> Self {
        Self {
            identifier: tab.name().to_string(),
            name: tab.name().to_string(),
            kind: TabKind::Predefined(tab),
        }
    }

    fn from_favorite(favorite: &Favorite) -> Self {
        let kind = match &favorite.favorited {
            Favoritable::View(view) => TabKind::View {
                favorite_id: favorite.id,
                view: view.clone(),
            },
            Favoritable::Page(page) => TabKind::Page {
                favorite_id: favorite.id,
                page: page.clone(),
            },
        };
        Self {
            identifier: favorite.tab_identifier(),
            name: favorite.name.clone(),
            kind,
        }
    }

    pub fn is_predefined(&self) -> bool {
        matches!(self.kind, TabKind::Predefined(_))
    }

    pub fn favorite_id(&self) -> Option<i64> {
        match &self.kind {
            TabKind::View { favorite_id, .. } | TabKind::Page { favorite_id, .. } => {
                Some(*favorite_id)
            }
            TabKind::Predefined(_) => None,
        }
    }

    pub fn view(&self) -> Option<&ViewParams> {
        match &self.kind {
            TabKind::View { view, .. } => Some(view),
            _ => None,
        }
    }

    /// Whether card lists can be shown under this tab.
    pub fn shows_cards(&self) -> bool {
        matches!(
            self.kind,
            TabKind::View { .. } | TabKind::Predefined(PredefinedTab::All)
        )
    }

    fn is_trailing(&self) -> bool {
        matches!(self.kind, TabKind::Predefined(t) if t.is_trailing())
    }
}

/// The ordered tabs of one project.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTabs {
    tabs: Vec<DisplayTab>,
    explicit_order: Option<Vec<String>>,
}

impl DisplayTabs {
    pub fn load(db: &MingleDb, project: &Project) -> Result<Self> {
        let favorites = db.list_favorites(project.id)?;
        let order = db.get_tab_order(project.id)?;
        Ok(Self::build(&favorites, order))
    }

    /// Arrange predefined tabs and the team tabs among `favorites`.
    pub fn build(favorites: &[Favorite], explicit_order: Option<Vec<String>>) -> Self {
        let mut defaults = vec![
            DisplayTab::predefined(PredefinedTab::Overview),
            DisplayTab::predefined(PredefinedTab::All),
        ];
        defaults.extend(
            favorites
                .iter()
                .filter(|f| f.scope() == FavoriteScope::TeamTab)
                .map(DisplayTab::from_favorite),
        );
        defaults.push(DisplayTab::predefined(PredefinedTab::Dependencies));
        defaults.push(DisplayTab::predefined(PredefinedTab::History));

        let tabs = match &explicit_order {
            None => defaults,
            Some(order) => apply_order(defaults, order),
        };
        Self {
            tabs,
            explicit_order,
        }
    }

    pub fn tabs(&self) -> &[DisplayTab] {
        &self.tabs
    }

    pub fn names(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.tabs.iter().map(|t| t.identifier.clone()).collect()
    }

    pub fn explicit_order(&self) -> Option<&[String]> {
        self.explicit_order.as_deref()
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<&DisplayTab> {
        self.tabs.iter().find(|t| t.identifier == identifier)
    }

    /// Exact name match first, then a case-insensitive one.
    pub fn find_by_name(&self, name: &str) -> Option<&DisplayTab> {
        self.tabs
            .iter()
            .find(|t| t.name == name)
            .or_else(|| self.tabs.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
    }

    fn all_tab(&self) -> &DisplayTab {
        self.tabs
            .iter()
            .find(|t| t.kind == TabKind::Predefined(PredefinedTab::All))
            .unwrap_or(&self.tabs[0])
    }

    /// Tab highlighted for a card list request naming `requested`.
    pub fn current_tab_for_list(&self, requested: Option<&str>) -> &DisplayTab {
        requested
            .and_then(|name| self.find_by_name(name))
            .filter(|t| t.shows_cards())
            .unwrap_or_else(|| self.all_tab())
    }

    /// Tab highlighted for a single card, given the tab its navigation
    /// resolved to.
    pub fn current_tab_for_card(&self, navigation_tab: &str) -> &DisplayTab {
        self.current_tab_for_list(Some(navigation_tab))
    }

    /// Whether `live` has drifted from what `tab` shows by default.
    pub fn is_dirty(&self, tab: &DisplayTab, live: &ViewParams) -> bool {
        match &tab.kind {
            TabKind::View { view, .. } => {
                view.canonical_filter_string() != live.canonical_filter_string()
            }
            TabKind::Predefined(PredefinedTab::All) => live.is_filtered(),
            _ => false,
        }
    }

    /// Identifiers of the stored ordering that still resolve, with `removed`
    /// dropped. `None` when no ordering is stored.
    pub(crate) fn pruned_order(&self, removed: &str) -> Option<Vec<String>> {
        self.explicit_order.as_ref().map(|order| {
            order
                .iter()
                .filter(|id| id.as_str() != removed && self.find_by_identifier(id).is_some())
                .cloned()
                .collect()
        })
    }

    fn name_taken(&self, name: &str, except_identifier: &str) -> bool {
        PredefinedTab::from_name(name).is_some()
            || self
                .tabs
                .iter()
                .any(|t| t.identifier != except_identifier && t.name == name)
    }
}

fn apply_order(defaults: Vec<DisplayTab>, order: &[String]) -> Vec<DisplayTab> {
    let mut remaining = defaults;
    let mut ordered = Vec::with_capacity(remaining.len());
    for identifier in order {
        if let Some(pos) = remaining.iter().position(|t| &t.identifier == identifier) {
            ordered.push(remaining.remove(pos));
        }
    }
    for tab in remaining {
        if tab.is_trailing() {
            ordered.push(tab);
            continue;
        }
        let anchor = ordered
            .iter()
            .position(|t| t.kind == TabKind::Predefined(PredefinedTab::Dependencies))
            .or_else(|| ordered.iter().position(DisplayTab::is_trailing))
            .unwrap_or(ordered.len());
        ordered.insert(anchor, tab);
    }
    ordered
}

/// Tab and favorite changes, authorized and persisted through `MingleDb`.
pub struct TabManager<'a> {
    db: &'a MingleDb,
    authorizer: &'a dyn Authorizer,
}

impl<'a> TabManager<'a> {
    pub fn new(db: &'a MingleDb, authorizer: &'a dyn Authorizer) -> Self {
        Self { db, authorizer }
    }

    pub fn display_tabs(&self, project: &Project) -> Result<DisplayTabs, TabError> {
        DisplayTabs::load(self.db, project).map_err(TabError::Store)
    }

    /// Store a new tab ordering. Every identifier must name an existing tab
    /// exactly once; otherwise nothing changes.
    pub fn reorder(
        &self,
        user: &User,
        project: &Project,
        new_order: &[String],
    ) -> Result<DisplayTabs, TabError> {
        self.authorizer.authorize(user, Action::ManageTabs, project)?;
        let tabs = self.display_tabs(project)?;

        let mut seen = std::collections::HashSet::new();
        for identifier in new_order {
            if tabs.find_by_identifier(identifier).is_none() {
                return Err(TabError::UnknownIdentifier {
                    identifier: identifier.clone(),
                });
            }
            if !seen.insert(identifier.as_str()) {
                return Err(TabError::DuplicateIdentifier {
                    identifier: identifier.clone(),
                });
            }
        }

        self.db
            .set_tab_order(project.id, new_order)
            .map_err(TabError::Store)?;
        tracing::info!(project = %project.identifier, order = ?new_order, "Reordered tabs");
        self.display_tabs(project)
    }

    /// Rename a user tab. Page tabs rename their page and leave a stub page
    /// under the old name.
    pub fn rename(
        &self,
        user: &User,
        project: &Project,
        identifier: &str,
        new_name: &str,
    ) -> Result<DisplayTab, TabError> {
        self.authorizer.authorize(user, Action::ManageTabs, project)?;
        let tabs = self.display_tabs(project)?;
        let tab = tabs
            .find_by_identifier(identifier)
            .ok_or_else(|| TabError::UnknownIdentifier {
                identifier: identifier.to_string(),
            })?;

        if let TabKind::Predefined(_) = tab.kind {
            return Err(TabError::Predefined {
                name: tab.name.clone(),
            });
        }
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(TabError::BlankName);
        }
        if tabs.name_taken(new_name, identifier) {
            return Err(TabError::NameTaken {
                name: new_name.to_string(),
            });
        }

        match &tab.kind {
            TabKind::View { favorite_id, .. } => {
                self.db
                    .rename_favorite(*favorite_id, new_name)
                    .map_err(TabError::Store)?;
            }
            TabKind::Page { favorite_id, page } => {
                let page = self
                    .db
                    .get_page(page.page_id)
                    .map_err(TabError::Store)?
                    .ok_or_else(|| TabError::PageNotFound {
                        identifier: page.identifier.clone(),
                    })?;
                let new_identifier = Page::identifier_for(new_name);
                if new_identifier != page.identifier
                    && self
                        .db
                        .find_page(project.id, &new_identifier)
                        .map_err(TabError::Store)?
                        .is_some()
                {
                    return Err(TabError::NameTaken {
                        name: new_name.to_string(),
                    });
                }
                let favorite = self
                    .db
                    .get_favorite(*favorite_id)
                    .map_err(TabError::Store)?
                    .ok_or(TabError::FavoriteNotFound { id: *favorite_id })?;
                self.db
                    .rename_page_favorite(&favorite, &page, new_name)
                    .map_err(TabError::Store)?;
            }
            TabKind::Predefined(_) => {}
        }

        tracing::info!(
            project = %project.identifier,
            identifier,
            from = %tab.name,
            to = new_name,
            "Renamed tab"
        );
        let tabs = self.display_tabs(project)?;
        tabs.find_by_identifier(identifier)
            .cloned()
            .ok_or_else(|| TabError::UnknownIdentifier {
                identifier: identifier.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleAuthorizer;
    use crate::project::models::{ProjectRole, ProjectSchema};

    fn favorite(id: i64, name: &str, tab_view: bool, user_id: Option<i64>) -> Favorite {
        Favorite {
            id,
            project_id: 1,
            name: name.into(),
            favorited: Favoritable::View(Box::default()),
            tab_view,
            user_id,
            created_at: String::new(),
        }
    }

    #[test]
    fn default_order_places_user_tabs_between_all_and_dependencies() {
        let tabs = DisplayTabs::build(
            &[
                favorite(1, "Bugs", true, None),
                favorite(2, "Saved", false, None),
                favorite(3, "Mine", true, Some(7)),
                favorite(4, "Stories", true, None),
            ],
            None,
        );
        assert_eq!(
            tabs.names(),
            vec!["Overview", "All", "Bugs", "Stories", "Dependencies", "History"]
        );
    }

    #[test]
    fn explicit_order_skips_stale_and_inserts_new_before_dependencies() {
        let order = vec![
            "History".to_string(),
            "4".to_string(),
            "99".to_string(),
            "All".to_string(),
            "Dependencies".to_string(),
            "Overview".to_string(),
        ];
        let tabs = DisplayTabs::build(
            &[favorite(1, "Bugs", true, None), favorite(4, "Stories", true, None)],
            Some(order),
        );
        assert_eq!(
            tabs.names(),
            vec!["History", "Stories", "All", "Bugs", "Dependencies", "Overview"]
        );
    }

    #[test]
    fn find_by_name_prefers_exact_match() {
        let tabs = DisplayTabs::build(&[favorite(1, "bugs", true, None)], None);
        assert_eq!(tabs.find_by_name("bugs").map(|t| t.identifier.as_str()), Some("1"));
        assert_eq!(tabs.find_by_name("BUGS").map(|t| t.identifier.as_str()), Some("1"));
        assert!(tabs.find_by_identifier("Overview").is_some());
    }

    #[test]
    fn current_tab_falls_back_to_all() {
        let tabs = DisplayTabs::build(&[favorite(1, "Bugs", true, None)], None);
        assert_eq!(tabs.current_tab_for_list(Some("Bugs")).name, "Bugs");
        assert_eq!(tabs.current_tab_for_list(Some("Nope")).name, "All");
        assert_eq!(tabs.current_tab_for_list(Some("History")).name, "All");
        assert_eq!(tabs.current_tab_for_list(None).name, "All");
        assert_eq!(tabs.current_tab_for_card("Bugs").name, "Bugs");
    }

    #[test]
    fn dirty_when_live_filters_differ_from_saved() {
        let mut saved = favorite(1, "Bugs", true, None);
        let bug_view = ViewParams {
            tagged_with: ["bug".to_string()].into_iter().collect(),
            ..ViewParams::default()
        };
        saved.favorited = Favoritable::View(Box::new(bug_view.clone()));
        let tabs = DisplayTabs::build(&[saved], None);
        let tab = tabs.find_by_name("Bugs").unwrap();

        assert!(!tabs.is_dirty(tab, &bug_view));
        let reordered_columns = ViewParams {
            columns: vec!["Status".into()],
            ..bug_view
        };
        assert!(!tabs.is_dirty(tab, &reordered_columns));
        assert!(tabs.is_dirty(tab, &ViewParams::default()));

        let all = tabs.find_by_name("All").unwrap();
        assert!(!tabs.is_dirty(all, &ViewParams::default()));
        assert!(tabs.is_dirty(all, &reordered_columns));
    }

    struct Fixture {
        db: MingleDb,
        project: Project,
        admin: User,
    }

    fn fixture() -> Result<Fixture> {
        let db = MingleDb::new_in_memory()?;
        let project = db.create_project("p", "P", &ProjectSchema::default())?;
        let admin = db.upsert_user("admin", "Admin", ProjectRole::Admin)?;
        Ok(Fixture { db, project, admin })
    }

    fn view_tab(f: &Fixture, name: &str) -> Result<Favorite> {
        f.db.create_favorite(f.project.id, name, &Favoritable::View(Box::default()), true, None)
    }

    #[test]
    fn reorder_is_atomic_on_unknown_identifier() -> Result<()> {
        let f = fixture()?;
        let bugs = view_tab(&f, "Bugs")?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let before = manager.display_tabs(&f.project)?.names().join(",");

        let err = manager
            .reorder(
                &f.admin,
                &f.project,
                &[bugs.tab_identifier(), "bogus".into(), "All".into()],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TabError::UnknownIdentifier { ref identifier } if identifier == "bogus"
        ));
        assert!(err.to_string().contains("bogus"));
        assert_eq!(manager.display_tabs(&f.project)?.names().join(","), before);
        assert_eq!(f.db.get_tab_order(f.project.id)?, None);
        Ok(())
    }

    #[test]
    fn reorder_rejects_duplicates_and_applies_valid_order() -> Result<()> {
        let f = fixture()?;
        let bugs = view_tab(&f, "Bugs")?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);

        let err = manager
            .reorder(&f.admin, &f.project, &["All".into(), "All".into()])
            .unwrap_err();
        assert!(matches!(err, TabError::DuplicateIdentifier { .. }));

        let tabs = manager.reorder(
            &f.admin,
            &f.project,
            &[bugs.tab_identifier(), "All".into(), "Overview".into()],
        )?;
        assert_eq!(
            tabs.names(),
            vec!["Bugs", "All", "Overview", "Dependencies", "History"]
        );
        Ok(())
    }

    #[test]
    fn reorder_requires_admin() -> Result<()> {
        let f = fixture()?;
        let member = f.db.upsert_user("bob", "Bob", ProjectRole::TeamMember)?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let err = manager
            .reorder(&member, &f.project, &["All".into()])
            .unwrap_err();
        assert!(matches!(err, TabError::Access(_)));
        Ok(())
    }

    #[test]
    fn rename_collisions_leave_name_intact() -> Result<()> {
        let f = fixture()?;
        let bugs = view_tab(&f, "Bugs")?;
        view_tab(&f, "Stories")?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let id = bugs.tab_identifier();

        for taken in ["Stories", "All", "History"] {
            let err = manager.rename(&f.admin, &f.project, &id, taken).unwrap_err();
            assert!(matches!(err, TabError::NameTaken { .. }), "{taken}");
        }
        assert!(matches!(
            manager.rename(&f.admin, &f.project, &id, "  ").unwrap_err(),
            TabError::BlankName
        ));
        assert!(matches!(
            manager.rename(&f.admin, &f.project, "All", "Everything").unwrap_err(),
            TabError::Predefined { .. }
        ));
        assert_eq!(f.db.get_favorite(bugs.id)?.map(|b| b.name), Some("Bugs".into()));

        let renamed = manager.rename(&f.admin, &f.project, &id, "stories")?;
        assert_eq!(renamed.name, "stories");
        Ok(())
    }

    #[test]
    fn rename_page_tab_renames_page_and_leaves_stub() -> Result<()> {
        let f = fixture()?;
        let page = f.db.create_page(f.project.id, "Road Map", "plans")?;
        let fav = f.db.create_favorite(
            f.project.id,
            &page.name,
            &Favoritable::Page(PageRef {
                page_id: page.id,
                identifier: page.identifier.clone(),
            }),
            true,
            None,
        )?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);

        let tab = manager.rename(&f.admin, &f.project, &fav.tab_identifier(), "Release Plan")?;
        assert_eq!(tab.name, "Release Plan");
        let stub = f.db.find_page(f.project.id, "Road_Map")?.expect("stub page");
        assert_eq!(stub.content, "This page was renamed to [[Release Plan]].");
        assert_eq!(
            f.db.get_page(page.id)?.map(|p| p.identifier),
            Some("Release_Plan".into())
        );
        Ok(())
    }

    #[test]
    fn rename_page_tab_keeping_identifier_leaves_no_stub() -> Result<()> {
        let f = fixture()?;
        let page = f.db.create_page(f.project.id, "Road Map", "plans")?;
        let fav = f.db.create_favorite(
            f.project.id,
            &page.name,
            &Favoritable::Page(PageRef {
                page_id: page.id,
                identifier: page.identifier.clone(),
            }),
            true,
            None,
        )?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);

        for name in ["Road_Map", "Road_Map"] {
            let tab = manager.rename(&f.admin, &f.project, &fav.tab_identifier(), name)?;
            assert_eq!(tab.name, name);
        }
        let renamed = f.db.find_page(f.project.id, "Road_Map")?.expect("renamed page");
        assert_eq!(renamed.id, page.id);
        assert_eq!(renamed.name, "Road_Map");
        assert_eq!(renamed.content, "plans");
        assert_eq!(f.db.get_favorite(fav.id)?.map(|saved| saved.name), Some("Road_Map".into()));
        Ok(())
    }

    #[test]
    fn rename_page_tab_onto_existing_page_fails() -> Result<()> {
        let f = fixture()?;
        let page = f.db.create_page(f.project.id, "Road Map", "")?;
        f.db.create_page(f.project.id, "Notes", "")?;
        let fav = f.db.create_favorite(
            f.project.id,
            &page.name,
            &Favoritable::Page(PageRef {
                page_id: page.id,
                identifier: page.identifier.clone(),
            }),
            true,
            None,
        )?;
        let manager = TabManager::new(&f.db, &RoleAuthorizer);
        let err = manager
            .rename(&f.admin, &f.project, &fav.tab_identifier(), "Notes")
            .unwrap_err();
        assert!(matches!(err, TabError::NameTaken { .. }));
        assert!(f.db.find_page(f.project.id, "Road_Map")?.is_some());
        Ok(())
    }
}
