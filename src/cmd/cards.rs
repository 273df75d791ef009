//! Card list commands: `mingle view`, `mingle cards`.

use anyhow::Result;

use mingle::auth::RoleAuthorizer;
use mingle::context::ListSource;
use mingle::context::flow::NavigationFlow;
use mingle::mingle_config::MingleConfig;
use mingle::view::{MqlCodec, RequestParams, SimpleMql, ViewParams};

use super::super::{CardsCommands, Cli, ViewCommands};
use super::open_workspace;

pub fn cmd_view(config: &MingleConfig, cli: &Cli, command: ViewCommands) -> Result<()> {
    let ws = open_workspace(config, cli)?;
    match command {
        ViewCommands::Normalize { query } => {
            let view = ViewParams::from_query(&ws.project, &query, &SimpleMql)?;
            println!("params:    {}", view.to_query());
            println!("canonical: {}", view.canonical_string());
            println!("filters:   {}", view.canonical_filter_string());
            if !view.filters.is_empty() {
                println!("mql:       {}", SimpleMql.encode(view.filters.terms()));
            }
        }
    }
    Ok(())
}

pub fn cmd_cards(config: &MingleConfig, cli: &Cli, command: CardsCommands) -> Result<()> {
    let ws = open_workspace(config, cli)?;
    let flow = NavigationFlow::new(&ws.db, &ws.db, &RoleAuthorizer, &SimpleMql);

    match command {
        CardsCommands::List { tab, query } => {
            let raw = query
                .as_deref()
                .map(RequestParams::parse_query)
                .unwrap_or_default();
            let list = flow.list_cards(&ws.user, &ws.project, &cli.session, tab.as_deref(), &raw)?;
            let marker = if list.dirty { " (modified)" } else { "" };
            println!("Tab: {}{}", list.tab.name, marker);
            println!("View: {}", list.view.to_query());
            if list.card_numbers.is_empty() {
                println!("No cards match this view.");
            }
            for number in &list.card_numbers {
                if let Some(card) = ws.db.get_card(ws.project.id, *number)? {
                    println!("  #{:<5} {:<10} {}", card.number, card.card_type, card.name);
                }
            }
        }
        CardsCommands::Show { number, from } => {
            if let Some(from) = from {
                flow.enter_from(&ws.project, &cli.session, parse_source(&from)?)?;
            }
            let shown = flow.show_card(&ws.user, &ws.project, &cli.session, number)?;
            if let Some(card) = ws.db.get_card(ws.project.id, number)? {
                println!("#{} {}", card.number, card.name);
            }
            println!("Tab: {}", shown.tab.name);
            if let Some(position) = shown.navigation.position_label() {
                println!("{}", position);
            }
            if let Some(previous) = shown.navigation.previous {
                println!("Previous: #{}", previous);
            }
            if let Some(next) = shown.navigation.next {
                println!("Next: #{}", next);
            }
            println!("{}", shown.navigation.up_link.label());
        }
        CardsCommands::Leave => {
            flow.leave(&ws.project, &cli.session)?;
            println!("Left the current card list.");
        }
    }
    Ok(())
}

fn parse_source(raw: &str) -> Result<ListSource> {
    let (kind, value) = raw.split_once(':').unwrap_or((raw, ""));
    match kind {
        "history" => Ok(ListSource::History),
        "search" => Ok(ListSource::Search {
            query: value.to_string(),
        }),
        "page" if !value.is_empty() => Ok(ListSource::Page {
            identifier: value.to_string(),
        }),
        _ => anyhow::bail!(
            "Invalid origin '{}'. Valid values: history, search:<query>, page:<identifier>",
            raw
        ),
    }
}
