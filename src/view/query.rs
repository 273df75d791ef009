//! Evaluate a `ViewParams` against a project's cards.

use std::cmp::Ordering;

use crate::project::models::{Card, Project};

use super::filter::compare_values;
use super::view_params::{SortOrder, ViewParams};

/// Cards matching `view`, in display order.
///
/// Without an explicit sort the newest card (highest number) comes first.
/// Cards with no value for the sort property always sort last.
pub fn select_cards<'a>(project: &Project, view: &ViewParams, cards: &'a [Card]) -> Vec<&'a Card> {
    let mut selected: Vec<&Card> = cards
        .iter()
        .filter(|c| matches_view(project, view, c))
        .collect();

    match view.sort.as_deref() {
        None | Some("Number") => {
            let order = view.order.unwrap_or(SortOrder::Desc);
            selected.sort_by(|a, b| apply_order(a.number.cmp(&b.number), order));
        }
        Some("Name") => {
            let order = view.order.unwrap_or(SortOrder::Asc);
            selected.sort_by(|a, b| {
                apply_order(a.name.to_lowercase().cmp(&b.name.to_lowercase()), order)
                    .then(b.number.cmp(&a.number))
            });
        }
        Some(property) => {
            let order = view.order.unwrap_or(SortOrder::Asc);
            let def = project.find_property(property);
            selected.sort_by(|a, b| {
                let by_value = match (a.property_value(property), b.property_value(property)) {
                    (Some(l), Some(r)) => {
                        let cmp = def
                            .as_ref()
                            .and_then(|d| compare_values(d, l, r))
                            .unwrap_or_else(|| l.cmp(r));
                        apply_order(cmp, order)
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                by_value.then(b.number.cmp(&a.number))
            });
        }
    }
    selected
}

/// Card numbers of [`select_cards`], the list stored for prev/next navigation.
pub fn card_numbers(project: &Project, view: &ViewParams, cards: &[Card]) -> Vec<u32> {
    select_cards(project, view, cards)
        .into_iter()
        .map(|c| c.number)
        .collect()
}

pub fn matches_view(project: &Project, view: &ViewParams, card: &Card) -> bool {
    if let Some(tree) = &view.tree_name
        && !card.in_tree(tree)
    {
        return false;
    }
    if view
        .excluded_card_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&card.card_type))
    {
        return false;
    }
    if !view.tagged_with.iter().all(|tag| card.has_tag(tag)) {
        return false;
    }
    view.filters.terms().iter().all(|t| t.matches(card, project))
}

fn apply_order(cmp: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => cmp,
        SortOrder::Desc => cmp.reverse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::models::{PropertyDefinition, PropertyKind, ProjectSchema, TreeConfig};
    use crate::view::mql::SimpleMql;
    use std::collections::BTreeMap;

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
                trees: vec![TreeConfig {
                    name: "Planning".into(),
                    card_types: vec!["Story".into()],
                }],
            },
            created_at: String::new(),
        }
    }

    fn card(number: u32, card_type: &str, props: &[(&str, &str)], tags: &[&str]) -> Card {
        Card {
            project_id: 1,
            number,
            name: format!("card {number}"),
            card_type: card_type.into(),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            trees: if card_type == "Story" {
                vec!["Planning".into()]
            } else {
                vec![]
            },
        }
    }

    fn cards() -> Vec<Card> {
        vec![
            card(1, "Story", &[("Estimate", "5"), ("Status", "Open")], &["ui"]),
            card(2, "Bug", &[("Estimate", "1"), ("Status", "New")], &["ui", "urgent"]),
            card(3, "Bug", &[("Status", "Closed")], &[]),
            card(4, "Bug", &[("Estimate", "3")], &["urgent"]),
        ]
    }

    fn view(query: &str) -> ViewParams {
        ViewParams::from_query(&project(), query, &SimpleMql).unwrap()
    }

    #[test]
    fn default_order_is_newest_first() {
        assert_eq!(card_numbers(&project(), &view(""), &cards()), vec![4, 3, 2, 1]);
    }

    #[test]
    fn filters_and_tags_are_anded() {
        let numbers = card_numbers(
            &project(),
            &view("filters[]=[Type][is][Bug]&tagged_with=urgent"),
            &cards(),
        );
        assert_eq!(numbers, vec![4, 2]);
    }

    #[test]
    fn excluded_types_and_tree_narrow_the_set() {
        assert_eq!(
            card_numbers(&project(), &view("excluded[]=Bug"), &cards()),
            vec![1]
        );
        assert_eq!(
            card_numbers(&project(), &view("style=tree&tree_name=Planning"), &cards()),
            vec![1]
        );
    }

    #[test]
    fn sort_by_property_puts_unset_values_last() {
        let numbers = card_numbers(&project(), &view("sort=Estimate"), &cards());
        assert_eq!(numbers, vec![2, 4, 1, 3]);

        let numbers = card_numbers(&project(), &view("sort=Estimate&order=desc"), &cards());
        assert_eq!(numbers, vec![1, 4, 2, 3]);
    }

    #[test]
    fn sort_by_enumerated_property_uses_value_order() {
        let numbers = card_numbers(&project(), &view("sort=status"), &cards());
        assert_eq!(numbers, vec![2, 1, 3, 4]);
    }

    #[test]
    fn mql_filters_select_cards() {
        let numbers = card_numbers(
            &project(),
            &view("filters[mql]=Type+%3D+Bug+AND+Estimate+%3E+2"),
            &cards(),
        );
        assert_eq!(numbers, vec![4]);
    }
}
