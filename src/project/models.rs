use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::view::ViewParams;

/// Name of the built-in property every card carries.
pub const TYPE_PROPERTY: &str = "Type";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Numeric,
    Enumerated,
    Date,
    User,
    Card,
    CardType,
}

impl PropertyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Enumerated => "enumerated",
            Self::Date => "date",
            Self::User => "user",
            Self::Card => "card",
            Self::CardType => "card_type",
        }
    }

    /// Whether "is less than" / "is greater than" style operators apply.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Numeric | Self::Date | Self::Enumerated)
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "numeric" => Ok(Self::Numeric),
            "enumerated" => Ok(Self::Enumerated),
            "date" => Ok(Self::Date),
            "user" => Ok(Self::User),
            "card" => Ok(Self::Card),
            "card_type" => Ok(Self::CardType),
            _ => Err(format!("Invalid property kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub name: String,
    pub kind: PropertyKind,
    /// Allowed values, in display order, for enumerated properties.
    #[serde(default)]
    pub values: Vec<String>,
}

impl PropertyDefinition {
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            values: Vec::new(),
        }
    }

    pub fn enumerated(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: PropertyKind::Enumerated,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Position of an enumerated value, compared case-insensitively.
    pub fn value_position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v.eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeConfig {
    pub name: String,
    /// Card types from the root of the tree downwards.
    #[serde(default)]
    pub card_types: Vec<String>,
}

/// The property, card type and tree configuration of a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSchema {
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub card_types: Vec<String>,
    #[serde(default)]
    pub trees: Vec<TreeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub schema: ProjectSchema,
    pub created_at: String,
}

impl Project {
    /// Look up a property by name, ignoring case. `Type` is always defined.
    pub fn find_property(&self, name: &str) -> Option<PropertyDefinition> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(TYPE_PROPERTY) {
            return Some(PropertyDefinition {
                name: TYPE_PROPERTY.to_string(),
                kind: PropertyKind::CardType,
                values: self.schema.card_types.clone(),
            });
        }
        self.schema
            .properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Canonical spelling of a card type name.
    pub fn find_card_type(&self, name: &str) -> Option<&str> {
        self.schema
            .card_types
            .iter()
            .find(|t| t.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }

    pub fn find_tree(&self, name: &str) -> Option<&TreeConfig> {
        self.schema
            .trees
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub project_id: i64,
    pub number: u32,
    pub name: String,
    pub card_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Names of the trees this card belongs to.
    #[serde(default)]
    pub trees: Vec<String>,
}

impl Card {
    /// Value of a property on this card, matched case-insensitively.
    pub fn property_value(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case(TYPE_PROPERTY) {
            return Some(&self.card_type);
        }
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn in_tree(&self, tree: &str) -> bool {
        self.trees.iter().any(|t| t.eq_ignore_ascii_case(tree))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub id: i64,
    pub project_id: i64,
    pub identifier: String,
    pub name: String,
    pub content: String,
}

impl Page {
    /// URL identifier for a page name: spaces become underscores.
    pub fn identifier_for(name: &str) -> String {
        name.trim().replace(' ', "_")
    }

    /// Content left behind under a page's old name after it is renamed.
    pub fn rename_stub(new_name: &str) -> String {
        format!("This page was renamed to [[{}]].", new_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Admin,
    TeamMember,
    ReadOnly,
    Anonymous,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::TeamMember => "team_member",
            Self::ReadOnly => "read_only",
            Self::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "team_member" => Ok(Self::TeamMember),
            "read_only" => Ok(Self::ReadOnly),
            "anonymous" => Ok(Self::Anonymous),
            _ => Err(format!("Invalid project role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub role: ProjectRole,
}

/// Reference to a wiki page held by a page favorite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRef {
    pub page_id: i64,
    pub identifier: String,
}

/// What a favorite points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Favoritable {
    View(Box<ViewParams>),
    Page(PageRef),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteScope {
    TeamTab,
    TeamFavorite,
    PersonalFavorite,
}

impl FavoriteScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamTab => "team_tab",
            Self::TeamFavorite => "team_favorite",
            Self::PersonalFavorite => "personal_favorite",
        }
    }
}

impl std::fmt::Display for FavoriteScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved view or page. Team favorites with `tab_view` set are tabs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub favorited: Favoritable,
    pub tab_view: bool,
    pub user_id: Option<i64>,
    pub created_at: String,
}

impl Favorite {
    pub fn scope(&self) -> FavoriteScope {
        match (self.user_id, self.tab_view) {
            (Some(_), _) => FavoriteScope::PersonalFavorite,
            (None, true) => FavoriteScope::TeamTab,
            (None, false) => FavoriteScope::TeamFavorite,
        }
    }

    /// Identifier used in the persisted tab ordering.
    pub fn tab_identifier(&self) -> String {
        self.id.to_string()
    }

    pub fn view(&self) -> Option<&ViewParams> {
        match &self.favorited {
            Favoritable::View(view) => Some(view),
            Favoritable::Page(_) => None,
        }
    }

    pub fn page(&self) -> Option<&PageRef> {
        match &self.favorited {
            Favoritable::Page(page) => Some(page),
            Favoritable::View(_) => None,
        }
    }
}

/// A user's subscription to a history filter. `filter_params` is the
/// filter's deterministic query string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistorySubscription {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub filter_params: String,
    pub created_at: String,
}

/// A whole project as accepted by `project import`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFixture {
    pub identifier: String,
    pub name: String,
    #[serde(flatten)]
    pub schema: ProjectSchema,
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub cards: Vec<CardFixture>,
    #[serde(default)]
    pub pages: Vec<PageFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFixture {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: ProjectRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardFixture {
    pub number: u32,
    pub name: String,
    pub card_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trees: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFixture {
    pub name: String,
    #[serde(default)]
    pub content: String,
}
