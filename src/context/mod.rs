//! Per-session card navigation state.
//!
//! A `CardContext` remembers, for each tab and tree, the view the user last
//! rendered and the card numbers it produced, so that showing a single card
//! can report "Card 2 of 3", link to its neighbours and highlight the tab the
//! user came from.
//!
//! | Module    | Responsibility                                           |
//! |-----------|----------------------------------------------------------|
//! | `session` | `SessionStore` trait, in-memory and SQLite backends      |
//! | `flow`    | Request-level list / show / leave operations             |

pub mod flow;
pub mod session;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::view::ViewParams;

pub use session::{InMemorySessionStore, SessionStore};

/// Tree key for views with no tree selected.
pub const NO_TREE: &str = "__no_tree__";

/// Tab highlighted when no other tab claims a card.
pub const ALL_TAB: &str = "All";

/// Where a list of cards came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListSource {
    CardList,
    History,
    Search { query: String },
    Page { identifier: String },
}

impl ListSource {
    /// Text of the "Up to ..." link back to this source.
    pub fn label(&self) -> String {
        match self {
            Self::CardList => ALL_TAB.to_string(),
            Self::History => "History".to_string(),
            Self::Search { .. } => "Search Results".to_string(),
            Self::Page { identifier } => identifier.replace('_', " "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub view: ViewParams,
    pub source: ListSource,
    #[serde(default)]
    pub card_numbers: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct TabState {
    last_tree: String,
    trees: BTreeMap<String, TabSnapshot>,
}

/// One-shot origin for cards opened from outside a card list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTab {
    pub source: ListSource,
    /// The card first shown under this origin; showing any other card
    /// discards the origin.
    pub first_card: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpLink {
    pub tab: String,
    pub source: Option<ListSource>,
}

impl UpLink {
    pub fn label(&self) -> String {
        match &self.source {
            Some(source) => format!("Up to {}", source.label()),
            None => format!("Up to {}", self.tab),
        }
    }
}

/// What a single-card page needs to render its navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardNavigation {
    pub card_number: u32,
    pub current_tab: String,
    /// 1-based position and list length when the card is in the current list.
    pub position: Option<(usize, usize)>,
    pub previous: Option<u32>,
    pub next: Option<u32>,
    pub up_link: UpLink,
}

impl CardNavigation {
    pub fn position_label(&self) -> Option<String> {
        self.position.map(|(i, n)| format!("Card {} of {}", i, n))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContext {
    #[serde(default)]
    tabs: BTreeMap<String, TabState>,
    #[serde(default)]
    current_tab: Option<String>,
    #[serde(default)]
    current_tree: Option<String>,
    #[serde(default)]
    last_tab: Option<LastTab>,
}

fn tree_key(view: &ViewParams) -> String {
    view.tree_name.clone().unwrap_or_else(|| NO_TREE.to_string())
}

impl CardContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tab(&self) -> Option<&str> {
        self.current_tab.as_deref()
    }

    pub fn current_tree(&self) -> Option<&str> {
        self.current_tree.as_deref()
    }

    pub fn last_tab(&self) -> Option<&LastTab> {
        self.last_tab.as_ref()
    }

    /// Record the view rendered under `tab_name` and make that tab and tree
    /// current. Any one-shot origin is dropped.
    pub fn store_tab_params(&mut self, view: &ViewParams, tab_name: &str, source: ListSource) {
        let tree = tree_key(view);
        let state = self.tabs.entry(tab_name.to_string()).or_default();
        let card_numbers = state
            .trees
            .get(&tree)
            .filter(|s| s.view == *view)
            .and_then(|s| s.card_numbers.clone());
        state.trees.insert(
            tree.clone(),
            TabSnapshot {
                view: view.clone(),
                source,
                card_numbers,
            },
        );
        state.last_tree = tree.clone();

        tracing::debug!(tab = tab_name, tree = %tree, "Stored tab params");
        self.current_tab = Some(tab_name.to_string());
        self.current_tree = Some(tree);
        self.last_tab = None;
    }

    fn current_snapshot(&self) -> Option<&TabSnapshot> {
        let tab = self.current_tab.as_ref()?;
        let tree = self.current_tree.as_ref()?;
        self.tabs.get(tab)?.trees.get(tree)
    }

    fn current_snapshot_mut(&mut self) -> Option<&mut TabSnapshot> {
        let tab = self.current_tab.as_ref()?;
        let tree = self.current_tree.as_ref()?;
        self.tabs.get_mut(tab)?.trees.get_mut(tree)
    }

    /// Record the ordered result of the latest render for the current tab and
    /// tree. Ignored when no tab is current.
    pub fn store_list_navigation_card_numbers(&mut self, numbers: Vec<u32>) {
        match self.current_snapshot_mut() {
            Some(snapshot) => snapshot.card_numbers = Some(numbers),
            None => tracing::debug!("No current tab; navigation list not stored"),
        }
    }

    pub fn current_list_navigation_card_numbers(&self) -> Option<&[u32]> {
        self.current_snapshot()?.card_numbers.as_deref()
    }

    /// Forget the current list. Later card shows resolve to "All".
    pub fn clear_current_list_navigation_card_numbers(&mut self) {
        if let Some(snapshot) = self.current_snapshot_mut() {
            snapshot.card_numbers = None;
        }
        self.current_tab = None;
        self.current_tree = None;
    }

    /// Remember that the user is about to open cards from `source`. The
    /// current list is left, so its tab no longer claims cards.
    pub fn enter_from(&mut self, source: ListSource) {
        tracing::debug!(?source, "Entering cards from outside a list");
        self.clear_current_list_navigation_card_numbers();
        self.last_tab = Some(LastTab {
            source,
            first_card: None,
        });
    }

    /// Resolve tab, position and links for showing card `number`.
    pub fn show_card(&mut self, number: u32) -> CardNavigation {
        if let (Some(tab), Some(snapshot)) = (self.current_tab.clone(), self.current_snapshot())
            && let Some(list) = snapshot.card_numbers.as_deref()
            && let Some(index) = list.iter().position(|&n| n == number)
        {
            let previous = index.checked_sub(1).map(|i| list[i]);
            let next = list.get(index + 1).copied();
            return CardNavigation {
                card_number: number,
                position: Some((index + 1, list.len())),
                previous,
                next,
                up_link: UpLink {
                    tab: tab.clone(),
                    source: (snapshot.source != ListSource::CardList)
                        .then(|| snapshot.source.clone()),
                },
                current_tab: tab,
            };
        }

        if let Some(last) = self.last_tab.as_mut() {
            match last.first_card {
                Some(first) if first != number => {
                    tracing::debug!(first, number, "Navigated past first card; dropping origin");
                    self.last_tab = None;
                }
                _ => {
                    last.first_card = Some(number);
                    return CardNavigation {
                        card_number: number,
                        current_tab: ALL_TAB.to_string(),
                        position: None,
                        previous: None,
                        next: None,
                        up_link: UpLink {
                            tab: ALL_TAB.to_string(),
                            source: Some(last.source.clone()),
                        },
                    };
                }
            }
        }

        CardNavigation {
            card_number: number,
            current_tab: ALL_TAB.to_string(),
            position: None,
            previous: None,
            next: None,
            up_link: UpLink {
                tab: ALL_TAB.to_string(),
                source: None,
            },
        }
    }

    /// The view a tab showed last, under the tree it was last used with.
    pub fn last_params_for_tab(&self, tab_name: &str) -> Option<&ViewParams> {
        let state = self.tabs.get(tab_name)?;
        state.trees.get(&state.last_tree).map(|s| &s.view)
    }

    pub fn rename_tab(&mut self, old_name: &str, new_name: &str) {
        if let Some(state) = self.tabs.remove(old_name) {
            self.tabs.insert(new_name.to_string(), state);
        }
        if self.current_tab.as_deref() == Some(old_name) {
            self.current_tab = Some(new_name.to_string());
        }
    }

    pub fn forget_tab(&mut self, tab_name: &str) {
        self.tabs.remove(tab_name);
        if self.current_tab.as_deref() == Some(tab_name) {
            self.current_tab = None;
            self.current_tree = None;
        }
    }
}
