use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};

use crate::project::MingleDb;

use super::CardContext;

/// Server-side storage of `CardContext`, keyed by session and project.
/// Concurrent writers race; the last save wins.
pub trait SessionStore {
    fn load(&self, session_id: &str, project_id: i64) -> Result<Option<CardContext>>;
    fn save(&self, session_id: &str, project_id: i64, context: &CardContext) -> Result<()>;
    fn clear(&self, session_id: &str, project_id: i64) -> Result<()>;

    /// The stored context, or a fresh one for a new session.
    fn load_or_default(&self, session_id: &str, project_id: i64) -> Result<CardContext> {
        Ok(self.load(session_id, project_id)?.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<(String, i64), CardContext>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, i64), CardContext>>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Session store lock poisoned: {}", e))
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str, project_id: i64) -> Result<Option<CardContext>> {
        Ok(self
            .lock()?
            .get(&(session_id.to_string(), project_id))
            .cloned())
    }

    fn save(&self, session_id: &str, project_id: i64, context: &CardContext) -> Result<()> {
        self.lock()?
            .insert((session_id.to_string(), project_id), context.clone());
        Ok(())
    }

    fn clear(&self, session_id: &str, project_id: i64) -> Result<()> {
        self.lock()?.remove(&(session_id.to_string(), project_id));
        Ok(())
    }
}

impl SessionStore for MingleDb {
    fn load(&self, session_id: &str, project_id: i64) -> Result<Option<CardContext>> {
        match self.load_session(session_id, project_id)? {
            Some(json) => {
                let context =
                    serde_json::from_str(&json).context("Failed to parse stored card context")?;
                Ok(Some(context))
            }
            None => Ok(None),
        }
    }

    fn save(&self, session_id: &str, project_id: i64, context: &CardContext) -> Result<()> {
        let json = serde_json::to_string(context).context("Failed to serialize card context")?;
        self.save_session(session_id, project_id, &json)
    }

    fn clear(&self, session_id: &str, project_id: i64) -> Result<()> {
        self.delete_session(session_id, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ListSource;
    use crate::project::models::ProjectSchema;
    use crate::view::ViewParams;

    fn context() -> CardContext {
        let mut ctx = CardContext::new();
        ctx.store_tab_params(&ViewParams::default(), "All", ListSource::CardList);
        ctx.store_list_navigation_card_numbers(vec![3, 2, 1]);
        ctx
    }

    fn round_trip(store: &dyn SessionStore, project_id: i64) -> Result<()> {
        assert!(store.load("s1", project_id)?.is_none());
        assert_eq!(store.load_or_default("s1", project_id)?, CardContext::default());

        store.save("s1", project_id, &context())?;
        assert_eq!(store.load("s1", project_id)?, Some(context()));
        assert!(store.load("s2", project_id)?.is_none());

        store.clear("s1", project_id)?;
        assert!(store.load("s1", project_id)?.is_none());
        Ok(())
    }

    #[test]
    fn in_memory_store_round_trips() -> Result<()> {
        round_trip(&InMemorySessionStore::new(), 1)
    }

    #[test]
    fn sqlite_store_round_trips() -> Result<()> {
        let db = MingleDb::new_in_memory()?;
        let project = db.create_project("p", "P", &ProjectSchema::default())?;
        round_trip(&db, project.id)
    }
}
