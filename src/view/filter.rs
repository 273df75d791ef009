//! Card filter terms written as `[property][operator][value]`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::FilterError;
use crate::project::models::{Card, Project, PropertyDefinition, PropertyKind};

static TERM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]]*)\]\[([^\[\]]*)\]\[(.*)\]$").unwrap());

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d %b %Y", "%d/%m/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Is,
    IsNot,
    IsLessThan,
    IsGreaterThan,
    IsBefore,
    IsAfter,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::IsLessThan => "is less than",
            Self::IsGreaterThan => "is greater than",
            Self::IsBefore => "is before",
            Self::IsAfter => "is after",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, Self::Is | Self::IsNot)
    }

    fn applies_to(&self, kind: PropertyKind) -> bool {
        match self {
            Self::Is | Self::IsNot => true,
            Self::IsLessThan | Self::IsGreaterThan => {
                matches!(kind, PropertyKind::Numeric | PropertyKind::Enumerated)
            }
            Self::IsBefore | Self::IsAfter => kind == PropertyKind::Date,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match normalized.as_str() {
            "is" => Ok(Self::Is),
            "is not" => Ok(Self::IsNot),
            "is less than" => Ok(Self::IsLessThan),
            "is greater than" => Ok(Self::IsGreaterThan),
            "is before" => Ok(Self::IsBefore),
            "is after" => Ok(Self::IsAfter),
            _ => Err(FilterError::UnknownOperator {
                operator: s.trim().to_string(),
            }),
        }
    }
}

/// One filter term. An empty value means "(not set)".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterTerm {
    pub property: String,
    pub operator: Operator,
    pub value: String,
}

impl FilterTerm {
    pub fn new(property: &str, operator: Operator, value: &str) -> Self {
        Self {
            property: property.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    /// Parse the bracketed syntax without consulting any project.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let malformed = || FilterError::Malformed {
            raw: raw.to_string(),
        };
        let caps = TERM_REGEX.captures(raw.trim()).ok_or_else(malformed)?;
        let property = caps.get(1).map_or("", |m| m.as_str()).trim();
        if property.is_empty() {
            return Err(malformed());
        }
        let operator: Operator = caps.get(2).map_or("", |m| m.as_str()).parse()?;
        let value = caps.get(3).map_or("", |m| m.as_str()).trim();
        Ok(Self::new(property, operator, value))
    }

    /// Validate against the project and rewrite into canonical spelling:
    /// property and card type names as defined, dates as `YYYY-MM-DD`.
    pub fn normalize(self, project: &Project) -> Result<Self, FilterError> {
        let def = project
            .find_property(&self.property)
            .ok_or_else(|| FilterError::UnknownProperty {
                name: self.property.clone(),
            })?;

        if !self.operator.applies_to(def.kind) {
            return Err(FilterError::UnsupportedOperator {
                property: def.name,
                operator: self.operator.to_string(),
            });
        }
        if self.operator.is_ordering() && self.value.is_empty() {
            return Err(FilterError::Malformed {
                raw: self.to_string(),
            });
        }

        let value = normalize_value(project, &def, &self.value)?;
        Ok(Self {
            property: def.name,
            operator: self.operator,
            value,
        })
    }

    pub fn matches(&self, card: &Card, project: &Project) -> bool {
        let actual = card.property_value(&self.property);
        match self.operator {
            Operator::Is => value_equals(actual, &self.value),
            Operator::IsNot => !value_equals(actual, &self.value),
            _ => {
                let (Some(def), Some(actual)) = (project.find_property(&self.property), actual)
                else {
                    return false;
                };
                let wanted = match self.operator {
                    Operator::IsLessThan | Operator::IsBefore => Ordering::Less,
                    _ => Ordering::Greater,
                };
                compare_values(&def, actual, &self.value) == Some(wanted)
            }
        }
    }

    /// Ordering key used by canonical strings.
    pub(crate) fn sort_key(&self) -> (String, Operator, String) {
        (
            self.property.to_lowercase(),
            self.operator,
            self.value.to_lowercase(),
        )
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}][{}]", self.property, self.operator, self.value)
    }
}

fn value_equals(actual: Option<&str>, expected: &str) -> bool {
    match actual {
        None => expected.is_empty(),
        Some(actual) => actual.eq_ignore_ascii_case(expected),
    }
}

fn normalize_value(
    project: &Project,
    def: &PropertyDefinition,
    value: &str,
) -> Result<String, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    match def.kind {
        PropertyKind::Numeric => match value.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(value.to_string()),
            _ => Err(FilterError::InvalidNumericValue {
                property: def.name.clone(),
                value: value.to_string(),
            }),
        },
        PropertyKind::Date => parse_date(value)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .ok_or_else(|| FilterError::InvalidDate {
                property: def.name.clone(),
                value: value.to_string(),
            }),
        PropertyKind::CardType => project
            .find_card_type(value)
            .map(str::to_string)
            .ok_or_else(|| FilterError::UnknownCardType {
                name: value.to_string(),
            }),
        PropertyKind::Enumerated => Ok(def
            .value_position(value)
            .map(|i| def.values[i].clone())
            .unwrap_or_else(|| value.to_string())),
        PropertyKind::Text | PropertyKind::User | PropertyKind::Card => Ok(value.to_string()),
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

/// Compare two property values according to the property's kind.
/// `None` when either side cannot be interpreted.
pub(crate) fn compare_values(
    def: &PropertyDefinition,
    left: &str,
    right: &str,
) -> Option<Ordering> {
    match def.kind {
        PropertyKind::Numeric => {
            let l = left.trim().parse::<f64>().ok()?;
            let r = right.trim().parse::<f64>().ok()?;
            l.partial_cmp(&r)
        }
        PropertyKind::Date => Some(parse_date(left)?.cmp(&parse_date(right)?)),
        PropertyKind::Enumerated => {
            Some(def.value_position(left)?.cmp(&def.value_position(right)?))
        }
        _ => Some(left.to_lowercase().cmp(&right.to_lowercase())),
    }
}
