//! History filters: which card and page events a feed or subscription shows.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::FilterError;
use crate::project::models::Project;
use crate::view::filter::{FilterTerm, Operator};
use crate::view::params::{RequestParams, split_list};

pub const PERIOD: &str = "period";
pub const INVOLVED_PROPERTIES: &str = "involved_filter_properties";
pub const ACQUIRED_PROPERTIES: &str = "acquired_filter_properties";
pub const INVOLVED_TAGS: &str = "involved_filter_tags";
pub const ACQUIRED_TAGS: &str = "acquired_filter_tags";
pub const FILTER_TYPES: &str = "filter_types[]";
pub const FILTER_USER: &str = "filter_user";
pub const CARD_NUMBER: &str = "card_number";
pub const PAGE_IDENTIFIER: &str = "page_identifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    #[default]
    AllHistory,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last_7_days",
            Self::Last30Days => "last_30_days",
            Self::AllHistory => "all_history",
        }
    }

    /// Inclusive date range covered on `today`; `None` for all history.
    pub fn bounds(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let back = |days: u64| today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        match self {
            Self::Today => Some((today, today)),
            Self::Yesterday => Some((back(1), back(1))),
            Self::Last7Days => Some((back(6), today)),
            Self::Last30Days => Some((back(29), today)),
            Self::AllHistory => None,
        }
    }
}

impl FromStr for Period {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "last_7_days" => Ok(Self::Last7Days),
            "last_30_days" => Ok(Self::Last30Days),
            "all_history" => Ok(Self::AllHistory),
            other => Err(FilterError::InvalidHistoryParam {
                name: PERIOD.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Cards,
    Pages,
    Revisions,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cards => "cards",
            Self::Pages => "pages",
            Self::Revisions => "revisions",
        }
    }
}

impl FromStr for EventType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cards" => Ok(Self::Cards),
            "pages" => Ok(Self::Pages),
            "revisions" => Ok(Self::Revisions),
            _ => Err(FilterError::InvalidHistoryParam {
                name: "filter type".to_string(),
                value: s.trim().to_string(),
            }),
        }
    }
}

/// A normalized history filter.
///
/// "Involved" filters match events on cards that had the value before or
/// after the change; "acquired" filters match only changes that set it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilterParams {
    pub period: Period,
    pub involved_properties: BTreeMap<String, String>,
    pub acquired_properties: BTreeMap<String, String>,
    pub involved_tags: BTreeSet<String>,
    pub acquired_tags: BTreeSet<String>,
    pub filter_types: BTreeSet<EventType>,
    pub filter_user: Option<String>,
    pub card_number: Option<u32>,
    pub page_identifier: Option<String>,
}

impl HistoryFilterParams {
    pub fn from_params(project: &Project, raw: &RequestParams) -> Result<Self, FilterError> {
        let period = raw
            .get_present(PERIOD)
            .map(Period::from_str)
            .transpose()?
            .unwrap_or_default();

        let involved_properties = properties(project, raw, INVOLVED_PROPERTIES)?;
        let acquired_properties = properties(project, raw, ACQUIRED_PROPERTIES)?;
        let tags = |key: &str| -> BTreeSet<String> {
            raw.get_present(key)
                .map(split_list)
                .unwrap_or_default()
                .into_iter()
                .collect()
        };

        let filter_types = raw
            .get_all(FILTER_TYPES)
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(EventType::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;

        let card_number = raw
            .get_present(CARD_NUMBER)
            .map(|n| {
                n.trim_start_matches('#')
                    .parse::<u32>()
                    .map_err(|_| FilterError::InvalidHistoryParam {
                        name: "card number".to_string(),
                        value: n.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            period,
            involved_properties,
            acquired_properties,
            involved_tags: tags(INVOLVED_TAGS),
            acquired_tags: tags(ACQUIRED_TAGS),
            filter_types,
            filter_user: raw.get_present(FILTER_USER).map(str::to_string),
            card_number,
            page_identifier: raw.get_present(PAGE_IDENTIFIER).map(str::to_string),
        })
    }

    pub fn from_query(project: &Project, query: &str) -> Result<Self, FilterError> {
        Self::from_params(project, &RequestParams::parse_query(query))
    }

    /// Parameters in a fixed order with sorted keys, so equal filters always
    /// serialize identically.
    pub fn to_params(&self) -> RequestParams {
        let mut params = RequestParams::new().with(PERIOD, self.period.as_str());
        for (name, value) in &self.involved_properties {
            params.push(format!("{}[{}]", INVOLVED_PROPERTIES, name), value.as_str());
        }
        for (name, value) in &self.acquired_properties {
            params.push(format!("{}[{}]", ACQUIRED_PROPERTIES, name), value.as_str());
        }
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(",");
        if !self.involved_tags.is_empty() {
            params.push(INVOLVED_TAGS, join(&self.involved_tags));
        }
        if !self.acquired_tags.is_empty() {
            params.push(ACQUIRED_TAGS, join(&self.acquired_tags));
        }
        for event_type in &self.filter_types {
            params.push(FILTER_TYPES, event_type.as_str());
        }
        if let Some(user) = &self.filter_user {
            params.push(FILTER_USER, user.as_str());
        }
        if let Some(number) = self.card_number {
            params.push(CARD_NUMBER, number.to_string());
        }
        if let Some(page) = &self.page_identifier {
            params.push(PAGE_IDENTIFIER, page.as_str());
        }
        params
    }

    pub fn to_query(&self) -> String {
        self.to_params().to_query()
    }

    /// Whether the filter follows a single card or page.
    pub fn is_scoped(&self) -> bool {
        self.card_number.is_some() || self.page_identifier.is_some()
    }
}

/// Read `outer[Property]=value` pairs, checking each against the project.
fn properties(
    project: &Project,
    raw: &RequestParams,
    outer: &str,
) -> Result<BTreeMap<String, String>, FilterError> {
    let mut properties = BTreeMap::new();
    for (name, value) in raw.get_nested(outer) {
        let term = FilterTerm::new(name, Operator::Is, value).normalize(project)?;
        properties.insert(term.property, term.value);
    }
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::models::{PropertyDefinition, PropertyKind, ProjectSchema};

    fn project() -> Project {
        Project {
            id: 1,
            identifier: "p".into(),
            name: "P".into(),
            schema: ProjectSchema {
                properties: vec![
                    PropertyDefinition::new("Estimate", PropertyKind::Numeric),
                    PropertyDefinition::enumerated("Status", &["New", "Open", "Closed"]),
                ],
                card_types: vec!["Story".into(), "Bug".into()],
                trees: vec![],
            },
            created_at: String::new(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let today = date("2024-03-10");
        assert_eq!(Period::Today.bounds(today), Some((today, today)));
        assert_eq!(
            Period::Yesterday.bounds(today),
            Some((date("2024-03-09"), date("2024-03-09")))
        );
        assert_eq!(
            Period::Last7Days.bounds(today),
            Some((date("2024-03-04"), today))
        );
        assert_eq!(
            Period::Last30Days.bounds(today),
            Some((date("2024-02-10"), today))
        );
        assert_eq!(Period::AllHistory.bounds(today), None);
    }

    #[test]
    fn from_params_normalizes_properties_and_sets() {
        let filter = HistoryFilterParams::from_query(
            &project(),
            "period=last_7_days&involved_filter_properties[status]=open&acquired_filter_properties[type]=bug\
             &involved_filter_tags=b,a&filter_types[]=pages&filter_types[]=cards&card_number=%2342",
        )
        .unwrap();
        assert_eq!(filter.period, Period::Last7Days);
        assert_eq!(filter.involved_properties.get("Status").map(String::as_str), Some("Open"));
        assert_eq!(filter.acquired_properties.get("Type").map(String::as_str), Some("Bug"));
        assert_eq!(filter.involved_tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(
            filter.filter_types.iter().collect::<Vec<_>>(),
            vec![&EventType::Cards, &EventType::Pages]
        );
        assert_eq!(filter.card_number, Some(42));
        assert!(filter.is_scoped());
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = HistoryFilterParams::from_query(
            &project(),
            "involved_filter_tags=b,a&filter_types[]=pages&filter_types[]=cards",
        )
        .unwrap();
        let b = HistoryFilterParams::from_query(
            &project(),
            "filter_types[]=cards&involved_filter_tags=a,b&filter_types[]=pages",
        )
        .unwrap();
        assert_eq!(a.to_query(), b.to_query());
        assert_eq!(HistoryFilterParams::from_query(&project(), &a.to_query()).unwrap(), a);
    }

    #[test]
    fn default_filter_covers_all_history() {
        let filter = HistoryFilterParams::from_query(&project(), "").unwrap();
        assert_eq!(filter, HistoryFilterParams::default());
        assert_eq!(filter.to_query(), "period=all_history");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let p = project();
        assert!(matches!(
            HistoryFilterParams::from_query(&p, "period=fortnight"),
            Err(FilterError::InvalidHistoryParam { .. })
        ));
        assert_eq!(
            HistoryFilterParams::from_query(&p, "involved_filter_properties[Colour]=red").unwrap_err(),
            FilterError::UnknownProperty {
                name: "Colour".into()
            }
        );
        assert!(matches!(
            HistoryFilterParams::from_query(&p, "acquired_filter_properties[Estimate]=lots"),
            Err(FilterError::InvalidNumericValue { .. })
        ));
        assert!(matches!(
            HistoryFilterParams::from_query(&p, "card_number=abc"),
            Err(FilterError::InvalidHistoryParam { .. })
        ));
    }
}
