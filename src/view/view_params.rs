use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{FilterError, ViewError};
use crate::project::models::Project;

use super::filter::FilterTerm;
use super::mql::{MqlCodec, MqlFilter};
use super::params::{RequestParams, split_list};

pub const STYLE: &str = "style";
pub const FILTERS: &str = "filters[]";
pub const MQL: &str = "filters[mql]";
pub const COLUMNS: &str = "columns";
pub const SORT: &str = "sort";
pub const ORDER: &str = "order";
pub const GROUP_BY: &str = "group_by";
pub const COLOR_BY: &str = "color_by";
pub const TREE_NAME: &str = "tree_name";
pub const EXCLUDED: &str = "excluded[]";
pub const TAGGED_WITH: &str = "tagged_with";

/// Columns every card has without a property definition.
const BUILTIN_COLUMNS: [&str; 2] = ["Number", "Name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    List,
    Grid,
    Tree,
    Hierarchy,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Grid => "grid",
            Self::Tree => "tree",
            Self::Hierarchy => "hierarchy",
        }
    }

    pub fn needs_tree(&self) -> bool {
        matches!(self, Self::Tree | Self::Hierarchy)
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "grid" => Ok(Self::Grid),
            "tree" => Ok(Self::Tree),
            "hierarchy" => Ok(Self::Hierarchy),
            _ => Err(ViewError::InvalidStyle {
                style: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ViewError::InvalidSortOrder {
                order: s.to_string(),
            }),
        }
    }
}

/// Card filters: bracketed terms or one MQL query, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filters {
    Terms(Vec<FilterTerm>),
    Mql(MqlFilter),
}

impl Default for Filters {
    fn default() -> Self {
        Self::Terms(Vec::new())
    }
}

impl Filters {
    /// The conjunctive terms these filters stand for.
    pub fn terms(&self) -> &[FilterTerm] {
        match self {
            Self::Terms(terms) => terms,
            Self::Mql(mql) => &mql.terms,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Terms(terms) if terms.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    pub lane: Option<String>,
    pub row: Option<String>,
}

/// The normalized display parameters of a card list, grid or tree view.
///
/// Built once per request with [`ViewParams::construct_from_params`] and
/// compared with `==` or [`canonical_string`](ViewParams::canonical_string)
/// to decide whether the user is still looking at a saved view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewParams {
    pub style: Style,
    pub filters: Filters,
    pub columns: Vec<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub group_by: GroupBy,
    pub color_by: Option<String>,
    pub tree_name: Option<String>,
    pub excluded_card_types: BTreeSet<String>,
    pub tagged_with: BTreeSet<String>,
}

impl ViewParams {
    pub fn construct_from_params(
        project: &Project,
        raw: &RequestParams,
        mql_codec: &dyn MqlCodec,
    ) -> Result<Self, ViewError> {
        let style = match raw.get_present(STYLE) {
            Some(s) => s.parse()?,
            None => Style::default(),
        };

        let tree_name = match raw.get_present(TREE_NAME) {
            Some(name) => Some(
                project
                    .find_tree(name)
                    .map(|t| t.name.clone())
                    .ok_or_else(|| ViewError::UnknownTree {
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };
        if style.needs_tree() && tree_name.is_none() {
            return Err(ViewError::TreeRequired {
                style: style.to_string(),
            });
        }

        let filters = parse_filters(project, raw, mql_codec)?;

        let mut columns: Vec<String> = Vec::new();
        if let Some(list) = raw.get_present(COLUMNS) {
            for name in split_list(list) {
                let column = resolve_column(project, &name)?;
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }

        let sort = raw
            .get_present(SORT)
            .map(|name| resolve_column(project, name))
            .transpose()?;
        let order = raw
            .get_present(ORDER)
            .map(str::parse::<SortOrder>)
            .transpose()?;

        let mut group_by = GroupBy::default();
        for (axis, name) in raw.get_nested(GROUP_BY) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let property = Some(resolve_property(project, name)?);
            match axis {
                "lane" => group_by.lane = property,
                "row" => group_by.row = property,
                _ => {}
            }
        }

        let color_by = raw
            .get_present(COLOR_BY)
            .map(|name| resolve_property(project, name))
            .transpose()?;

        let mut excluded_card_types = BTreeSet::new();
        for name in raw.get_all(EXCLUDED) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let card_type = project
                .find_card_type(name)
                .ok_or_else(|| FilterError::UnknownCardType {
                    name: name.to_string(),
                })?;
            excluded_card_types.insert(card_type.to_string());
        }

        let tagged_with = raw
            .get_present(TAGGED_WITH)
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .collect();

        Ok(Self {
            style,
            filters,
            columns,
            sort,
            order,
            group_by,
            color_by,
            tree_name,
            excluded_card_types,
            tagged_with,
        })
    }

    /// Parse a stored or linked query string.
    pub fn from_query(
        project: &Project,
        query: &str,
        mql_codec: &dyn MqlCodec,
    ) -> Result<Self, ViewError> {
        Self::construct_from_params(project, &RequestParams::parse_query(query), mql_codec)
    }

    /// Flat parameters suitable for a redirect or link. Filter and column
    /// order is preserved exactly as constructed.
    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new().with(STYLE, self.style.as_str());
        if let Some(tree) = &self.tree_name {
            params.push(TREE_NAME, tree.as_str());
        }
        match &self.filters {
            Filters::Terms(terms) => {
                for term in terms {
                    params.push(FILTERS, term.to_string());
                }
            }
            Filters::Mql(mql) => params.push(MQL, mql.mql.as_str()),
        }
        if !self.columns.is_empty() {
            params.push(COLUMNS, self.columns.join(","));
        }
        if let Some(sort) = &self.sort {
            params.push(SORT, sort.as_str());
        }
        if let Some(order) = self.order {
            params.push(ORDER, order.as_str());
        }
        if let Some(lane) = &self.group_by.lane {
            params.push(format!("{}[lane]", GROUP_BY), lane.as_str());
        }
        if let Some(row) = &self.group_by.row {
            params.push(format!("{}[row]", GROUP_BY), row.as_str());
        }
        if let Some(color) = &self.color_by {
            params.push(COLOR_BY, color.as_str());
        }
        for card_type in &self.excluded_card_types {
            params.push(EXCLUDED, card_type.as_str());
        }
        if !self.tagged_with.is_empty() {
            let tags: Vec<&str> = self.tagged_with.iter().map(String::as_str).collect();
            params.push(TAGGED_WITH, tags.join(","));
        }
        params
    }

    pub fn to_query(&self) -> String {
        self.to_params().to_query()
    }

    /// Deterministic encoding of the whole view.
    ///
    /// Filter terms are sorted by (property, operator, value), compared
    /// case-insensitively, so two views that differ only in the order filters
    /// were added are canonically equal. Column order is part of the view.
    pub fn canonical_string(&self) -> String {
        format!(
            "style={};{};columns={};sort={};order={};lane={};row={};color={}",
            self.style,
            self.canonical_filter_string(),
            self.columns.join(","),
            self.sort.as_deref().unwrap_or_default(),
            self.order.map(|o| o.as_str()).unwrap_or_default(),
            self.group_by.lane.as_deref().unwrap_or_default(),
            self.group_by.row.as_deref().unwrap_or_default(),
            self.color_by.as_deref().unwrap_or_default(),
        )
    }

    /// The part of [`canonical_string`](Self::canonical_string) that decides
    /// which cards are shown: tree, filters, exclusions and tags.
    pub fn canonical_filter_string(&self) -> String {
        let (filters, mql) = match &self.filters {
            Filters::Terms(terms) => (canonical_terms(terms), String::new()),
            Filters::Mql(mql) => (String::new(), canonical_terms(&mql.terms)),
        };
        let lowered = |set: &BTreeSet<String>| {
            let items: BTreeSet<String> = set.iter().map(|s| s.to_lowercase()).collect();
            items.into_iter().collect::<Vec<_>>().join(",")
        };
        format!(
            "tree={};filters={};mql={};excluded={};tags={}",
            self.tree_name.as_deref().unwrap_or_default().to_lowercase(),
            filters,
            mql,
            lowered(&self.excluded_card_types),
            lowered(&self.tagged_with),
        )
    }

    /// Whether this view narrows the card set at all.
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
            || !self.excluded_card_types.is_empty()
            || !self.tagged_with.is_empty()
    }
}

fn parse_filters(
    project: &Project,
    raw: &RequestParams,
    mql_codec: &dyn MqlCodec,
) -> Result<Filters, ViewError> {
    let bracketed: Vec<&str> = raw
        .get_all(FILTERS)
        .into_iter()
        .filter(|f| !f.trim().is_empty())
        .collect();
    let mql = raw.get_present(MQL);

    match (bracketed.is_empty(), mql) {
        (false, Some(_)) => Err(FilterError::AmbiguousFilters.into()),
        (_, Some(mql)) => Ok(Filters::Mql(MqlFilter::parse(mql_codec, project, mql)?)),
        (_, None) => {
            let terms = bracketed
                .into_iter()
                .map(|raw| FilterTerm::parse(raw).and_then(|t| t.normalize(project)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Filters::Terms(terms))
        }
    }
}

fn resolve_property(project: &Project, name: &str) -> Result<String, ViewError> {
    project
        .find_property(name)
        .map(|def| def.name)
        .ok_or_else(|| ViewError::UnknownColumn {
            name: name.to_string(),
        })
}

fn resolve_column(project: &Project, name: &str) -> Result<String, ViewError> {
    if let Some(builtin) = BUILTIN_COLUMNS
        .iter()
        .find(|b| b.eq_ignore_ascii_case(name.trim()))
    {
        return Ok(builtin.to_string());
    }
    resolve_property(project, name)
}

/// Filter terms sorted by their case-insensitive sort key, lowercased.
fn canonical_terms(terms: &[FilterTerm]) -> String {
    let mut sorted: Vec<&FilterTerm> = terms.iter().collect();
    sorted.sort_by_key(|t| t.sort_key());
    sorted
        .iter()
        .map(|t| t.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}
