//! MQL filter codec.
//!
//! Views only need MQL as a string that can be turned into filter terms and
//! back. `SimpleMql` covers conjunctions of comparisons, e.g.
//! `type = Bug AND 'Estimate' < 3 AND owner IS NULL`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::FilterError;
use crate::project::models::{Project, PropertyKind};

use super::filter::{FilterTerm, Operator};

/// Translate between MQL text and filter terms.
pub trait MqlCodec {
    fn decode(&self, mql: &str) -> Result<Vec<FilterTerm>, FilterError>;
    fn encode(&self, terms: &[FilterTerm]) -> String;
}

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'([^']*)'|"([^"]*)"|(!=|<=|>=|=|<|>|\(|\))|([^\s=<>!()'"]+)"#).unwrap()
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Symbol(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Self::Word(s) | Self::Quoted(s) | Self::Symbol(s) => s,
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn tokenize(mql: &str) -> Vec<Token> {
    TOKEN_REGEX
        .captures_iter(mql)
        .filter_map(|caps| {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                Some(Token::Quoted(m.as_str().to_string()))
            } else if let Some(m) = caps.get(3) {
                Some(Token::Symbol(m.as_str().to_string()))
            } else {
                caps.get(4).map(|m| Token::Word(m.as_str().to_string()))
            }
        })
        .collect()
}

/// Conjunctive MQL: `<property> <op> <value> [AND ...]` with `=`, `!=`,
/// `<`, `>`, `IS NULL` and `IS NOT NULL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleMql;

impl SimpleMql {
    fn invalid(message: impl Into<String>) -> FilterError {
        FilterError::InvalidMql {
            message: message.into(),
        }
    }
}

impl MqlCodec for SimpleMql {
    fn decode(&self, mql: &str) -> Result<Vec<FilterTerm>, FilterError> {
        let tokens = tokenize(mql);
        if tokens.is_empty() {
            return Err(Self::invalid("query is blank"));
        }

        let mut terms = Vec::new();
        let mut iter = tokens.into_iter().peekable();
        loop {
            let property = match iter.next() {
                Some(Token::Symbol(s)) => {
                    return Err(Self::invalid(format!("unexpected '{}'", s)));
                }
                Some(tok) => tok.text().to_string(),
                None => return Err(Self::invalid("expected a property name")),
            };

            let op = iter
                .next()
                .ok_or_else(|| Self::invalid(format!("missing operator after {}", property)))?;
            let (operator, value) = if op.is_keyword("is") {
                let negated = iter.next_if(|t| t.is_keyword("not")).is_some();
                match iter.next() {
                    Some(t) if t.is_keyword("null") => {
                        (if negated { Operator::IsNot } else { Operator::Is }, String::new())
                    }
                    _ => return Err(Self::invalid("IS must be followed by NULL or NOT NULL")),
                }
            } else {
                let operator = match op.text() {
                    "=" => Operator::Is,
                    "!=" => Operator::IsNot,
                    "<" => Operator::IsLessThan,
                    ">" => Operator::IsGreaterThan,
                    other => {
                        return Err(Self::invalid(format!("unsupported operator '{}'", other)));
                    }
                };
                let value = match iter.next() {
                    Some(Token::Symbol(s)) => {
                        return Err(Self::invalid(format!("unexpected '{}'", s)));
                    }
                    Some(tok) => tok.text().to_string(),
                    None => return Err(Self::invalid(format!("missing value for {}", property))),
                };
                (operator, value)
            };
            terms.push(FilterTerm::new(&property, operator, &value));

            match iter.next() {
                None => break,
                Some(t) if t.is_keyword("and") => continue,
                Some(t) => {
                    return Err(Self::invalid(format!(
                        "only AND is supported between conditions, found '{}'",
                        t.text()
                    )));
                }
            }
        }
        Ok(terms)
    }

    fn encode(&self, terms: &[FilterTerm]) -> String {
        terms
            .iter()
            .map(|term| {
                let property = quote(&term.property);
                match (term.operator, term.value.is_empty()) {
                    (Operator::Is, true) => format!("{} IS NULL", property),
                    (Operator::IsNot, true) => format!("{} IS NOT NULL", property),
                    (op, _) => {
                        let symbol = match op {
                            Operator::Is => "=",
                            Operator::IsNot => "!=",
                            Operator::IsLessThan | Operator::IsBefore => "<",
                            Operator::IsGreaterThan | Operator::IsAfter => ">",
                        };
                        format!("{} {} {}", property, symbol, quote(&term.value))
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn quote(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{}\"", text)
    } else {
        format!("'{}'", text)
    }
}

/// A validated MQL filter: the source text plus the terms it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqlFilter {
    pub mql: String,
    pub terms: Vec<FilterTerm>,
}

impl MqlFilter {
    pub fn parse(codec: &dyn MqlCodec, project: &Project, raw: &str) -> Result<Self, FilterError> {
        let mql = collapse_whitespace(raw);
        let terms = codec
            .decode(&mql)?
            .into_iter()
            .map(|term| date_comparison(project, term).normalize(project))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mql, terms })
    }
}

/// Trim and collapse runs of whitespace to one space, outside quotes only.
fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    for c in raw.trim().chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None if c.is_whitespace() => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// `<` and `>` on a date property mean "is before" / "is after".
fn date_comparison(project: &Project, term: FilterTerm) -> FilterTerm {
    let is_date = project
        .find_property(&term.property)
        .is_some_and(|def| def.kind == PropertyKind::Date);
    if !is_date {
        return term;
    }
    let operator = match term.operator {
        Operator::IsLessThan => Operator::IsBefore,
        Operator::IsGreaterThan => Operator::IsAfter,
        other => other,
    };
    FilterTerm { operator, ..term }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::models::{PropertyDefinition, ProjectSchema};

    fn project() -> Project {
        Project {
            id: 1,
            identifier: "p".into(),
            name: "P".into(),
            schema: ProjectSchema {
                properties: vec![
                    PropertyDefinition::new("Estimate", PropertyKind::Numeric),
                    PropertyDefinition::new("Due Date", PropertyKind::Date),
                    PropertyDefinition::new("Owner", PropertyKind::User),
                ],
                card_types: vec!["Story".into(), "Bug".into()],
                trees: vec![],
            },
            created_at: String::new(),
        }
    }

    #[test]
    fn decode_reads_conjunctions() {
        let terms = SimpleMql
            .decode("type = Bug AND 'Estimate' < 3 and owner IS NOT NULL")
            .unwrap();
        assert_eq!(
            terms,
            vec![
                FilterTerm::new("type", Operator::Is, "Bug"),
                FilterTerm::new("Estimate", Operator::IsLessThan, "3"),
                FilterTerm::new("owner", Operator::IsNot, ""),
            ]
        );
    }

    #[test]
    fn decode_rejects_or_and_unknown_operators() {
        assert!(matches!(
            SimpleMql.decode("type = Bug OR type = Story"),
            Err(FilterError::InvalidMql { .. })
        ));
        assert!(matches!(
            SimpleMql.decode("Estimate >= 3"),
            Err(FilterError::InvalidMql { .. })
        ));
        assert!(matches!(
            SimpleMql.decode("   "),
            Err(FilterError::InvalidMql { .. })
        ));
    }

    #[test]
    fn encode_quotes_names_and_values() {
        let mql = SimpleMql.encode(&[
            FilterTerm::new("Due Date", Operator::IsBefore, "2024-03-05"),
            FilterTerm::new("Owner", Operator::Is, ""),
        ]);
        assert_eq!(mql, "'Due Date' < '2024-03-05' AND 'Owner' IS NULL");
        assert_eq!(SimpleMql.decode(&mql).unwrap().len(), 2);
    }

    #[test]
    fn mql_filter_normalizes_terms_against_project() {
        let filter = MqlFilter::parse(
            &SimpleMql,
            &project(),
            "TYPE =  bug   AND 'due date' < '05 Mar 2024'",
        )
        .unwrap();
        assert_eq!(filter.mql, "TYPE = bug AND 'due date' < '05 Mar 2024'");
        assert_eq!(
            filter.terms,
            vec![
                FilterTerm::new("Type", Operator::Is, "Bug"),
                FilterTerm::new("Due Date", Operator::IsBefore, "2024-03-05"),
            ]
        );
    }

    #[test]
    fn mql_filter_keeps_spacing_inside_quotes() {
        let filter =
            MqlFilter::parse(&SimpleMql, &project(), "  owner =   'Road   Map'  ").unwrap();
        assert_eq!(filter.mql, "owner = 'Road   Map'");
        assert_eq!(
            filter.terms,
            vec![FilterTerm::new("Owner", Operator::Is, "Road   Map")]
        );
    }

    #[test]
    fn mql_filter_reports_unknown_property() {
        let err = MqlFilter::parse(&SimpleMql, &project(), "Colour = red").unwrap_err();
        assert_eq!(err, FilterError::UnknownProperty { name: "Colour".into() });
    }
}
