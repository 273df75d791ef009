//! Request-level navigation: list cards under a tab, show one card, leave a
//! list. Each call loads the session's `CardContext`, updates it and saves it
//! back.

use anyhow::Result;

use crate::auth::{Action, Authorizer};
use crate::errors::InvalidResourceError;
use crate::project::MingleDb;
use crate::project::models::{Project, User};
use crate::tabs::{DisplayTab, DisplayTabs};
use crate::view::{MqlCodec, RequestParams, ViewParams, query};

use super::{CardNavigation, ListSource, SessionStore};

/// A rendered card list.
#[derive(Debug, Clone)]
pub struct CardList {
    pub tab: DisplayTab,
    pub view: ViewParams,
    pub card_numbers: Vec<u32>,
    /// The live view differs from what the tab shows by default.
    pub dirty: bool,
}

/// A single card with the tab it is shown under.
#[derive(Debug, Clone)]
pub struct CardShow {
    pub tab: DisplayTab,
    pub navigation: CardNavigation,
}

pub struct NavigationFlow<'a> {
    db: &'a MingleDb,
    sessions: &'a dyn SessionStore,
    authorizer: &'a dyn Authorizer,
    mql: &'a dyn MqlCodec,
}

impl<'a> NavigationFlow<'a> {
    pub fn new(
        db: &'a MingleDb,
        sessions: &'a dyn SessionStore,
        authorizer: &'a dyn Authorizer,
        mql: &'a dyn MqlCodec,
    ) -> Self {
        Self {
            db,
            sessions,
            authorizer,
            mql,
        }
    }

    /// List cards under `tab_name` (or All). Empty `raw` params restore the
    /// view this tab showed last in the session, then the tab's saved view.
    pub fn list_cards(
        &self,
        user: &User,
        project: &Project,
        session_id: &str,
        tab_name: Option<&str>,
        raw: &RequestParams,
    ) -> Result<CardList> {
        self.authorizer.authorize(user, Action::ViewProject, project)?;
        let tabs = DisplayTabs::load(self.db, project)?;
        let tab = tabs.current_tab_for_list(tab_name).clone();
        let mut context = self.sessions.load_or_default(session_id, project.id)?;

        let view = if raw.is_empty() {
            context
                .last_params_for_tab(&tab.name)
                .or_else(|| tab.view())
                .cloned()
                .unwrap_or_default()
        } else {
            ViewParams::construct_from_params(project, raw, self.mql)?
        };

        let cards = self.db.list_cards(project.id)?;
        let card_numbers = query::card_numbers(project, &view, &cards);

        context.store_tab_params(&view, &tab.name, ListSource::CardList);
        context.store_list_navigation_card_numbers(card_numbers.clone());
        self.sessions.save(session_id, project.id, &context)?;

        let dirty = tabs.is_dirty(&tab, &view);
        tracing::info!(
            project = %project.identifier,
            tab = %tab.name,
            cards = card_numbers.len(),
            dirty,
            "Listed cards"
        );
        Ok(CardList {
            tab,
            view,
            card_numbers,
            dirty,
        })
    }

    pub fn show_card(
        &self,
        user: &User,
        project: &Project,
        session_id: &str,
        number: u32,
    ) -> Result<CardShow> {
        self.authorizer.authorize(user, Action::ViewProject, project)?;
        if self.db.get_card(project.id, number)?.is_none() {
            return Err(InvalidResourceError::CardNotFound { number }.into());
        }

        let tabs = DisplayTabs::load(self.db, project)?;
        let mut context = self.sessions.load_or_default(session_id, project.id)?;
        let navigation = context.show_card(number);
        self.sessions.save(session_id, project.id, &context)?;

        let tab = tabs.current_tab_for_card(&navigation.current_tab).clone();
        tracing::debug!(number, tab = %tab.name, "Showing card");
        Ok(CardShow { tab, navigation })
    }

    /// Cards are about to be opened from history, search or a page.
    pub fn enter_from(
        &self,
        project: &Project,
        session_id: &str,
        source: ListSource,
    ) -> Result<()> {
        let mut context = self.sessions.load_or_default(session_id, project.id)?;
        context.enter_from(source);
        self.sessions.save(session_id, project.id, &context)
    }

    /// The user left the card list; later card shows resolve to All.
    pub fn leave(&self, project: &Project, session_id: &str) -> Result<()> {
        let mut context = self.sessions.load_or_default(session_id, project.id)?;
        context.clear_current_list_navigation_card_numbers();
        self.sessions.save(session_id, project.id, &context)
    }
}
