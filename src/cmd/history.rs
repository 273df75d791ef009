//! History feed and subscription commands: `mingle history`.

use anyhow::Result;

use mingle::auth::RoleAuthorizer;
use mingle::errors::{InvalidResourceError, SubscriptionError};
use mingle::history::{HistoryFilterParams, HistoryTokenCipher, SubscriptionService};
use mingle::mingle_config::MingleConfig;

use super::super::{Cli, HistoryCommands};
use super::open_workspace;

pub fn cmd_history(config: &MingleConfig, cli: &Cli, command: HistoryCommands) -> Result<()> {
    let ws = open_workspace(config, cli)?;
    let service = SubscriptionService::new(&ws.db, &RoleAuthorizer);

    match command {
        HistoryCommands::Token { query } => {
            let filter = HistoryFilterParams::from_query(&ws.project, &query)?;
            let cipher = HistoryTokenCipher::new(&config.history_secret());
            println!("{}", cipher.encrypt(&ws.project, &filter)?);
        }
        HistoryCommands::Decode { token } => {
            let cipher = HistoryTokenCipher::new(&config.history_secret());
            match cipher.decrypt(&ws.project, &token) {
                Ok(filter) => println!("{}", filter.to_query()),
                Err(e) => report_invalid(&e),
            }
        }
        HistoryCommands::Subscribe { query } => {
            let filter = HistoryFilterParams::from_query(&ws.project, &query)?;
            let subscription = service.subscribe(&ws.user, &ws.project, &filter)?;
            println!("Subscribed (id {}): {}", subscription.id, subscription.filter_params);
        }
        HistoryCommands::Unsubscribe { id } => {
            match service.unsubscribe(&ws.user, &ws.project, id) {
                Ok(subscription) => println!("Unsubscribed from {}", subscription.filter_params),
                Err(SubscriptionError::Invalid(e)) => report_invalid(&e),
                Err(e) => return Err(e.into()),
            }
        }
        HistoryCommands::Subscriptions => {
            let subscriptions = service.list(&ws.user, &ws.project)?;
            if subscriptions.is_empty() {
                println!("No history subscriptions.");
            }
            for subscription in subscriptions {
                println!("{:<4} {}", subscription.id, subscription.filter_params);
            }
        }
    }
    Ok(())
}

/// Invalid resources are not failures: print the message and where a
/// browser would have been sent.
fn report_invalid(error: &InvalidResourceError) {
    tracing::warn!(%error, "Invalid history resource");
    println!("{}", error);
    println!("Redirecting to {:?}", error.fallback());
}
