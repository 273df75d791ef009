use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use super::models::*;

pub struct MingleDb {
    conn: Connection,
}

impl MingleDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    identifier TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    schema TEXT NOT NULL DEFAULT '{}',
                    ordered_tab_identifiers TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    login TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT 'team_member'
                );

                CREATE TABLE IF NOT EXISTS cards (
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    number INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    card_type TEXT NOT NULL,
                    properties TEXT NOT NULL DEFAULT '{}',
                    tags TEXT NOT NULL DEFAULT '[]',
                    trees TEXT NOT NULL DEFAULT '[]',
                    PRIMARY KEY (project_id, number)
                );

                CREATE TABLE IF NOT EXISTS pages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    identifier TEXT NOT NULL,
                    name TEXT NOT NULL,
                    content TEXT NOT NULL DEFAULT '',
                    UNIQUE(project_id, identifier)
                );

                CREATE TABLE IF NOT EXISTS favorites (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    favorited TEXT NOT NULL,
                    tab_view INTEGER NOT NULL DEFAULT 0,
                    user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS history_subscriptions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    filter_params TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    UNIQUE(project_id, user_id, filter_params)
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    session_id TEXT NOT NULL,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    state TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (session_id, project_id)
                );

                CREATE INDEX IF NOT EXISTS idx_favorites_project ON favorites(project_id);
                CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON history_subscriptions(project_id, user_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn create_project(
        &self,
        identifier: &str,
        name: &str,
        schema: &ProjectSchema,
    ) -> Result<Project> {
        let schema_json = serde_json::to_string(schema).context("Failed to serialize schema")?;
        self.conn
            .execute(
                "INSERT INTO projects (identifier, name, schema) VALUES (?1, ?2, ?3)",
                params![identifier, name, schema_json],
            )
            .with_context(|| format!("Failed to insert project {}", identifier))?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, identifier, name, schema, created_at FROM projects ORDER BY id")
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], ProjectRow::from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            let r = row.context("Failed to read project row")?;
            projects.push(r.into_project()?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, identifier, name, schema, created_at FROM projects WHERE id = ?1",
                params![id],
                ProjectRow::from_row,
            )
            .optional()
            .context("Failed to query project")?;
        row.map(ProjectRow::into_project).transpose()
    }

    pub fn find_project(&self, identifier: &str) -> Result<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, identifier, name, schema, created_at FROM projects WHERE identifier = ?1",
                params![identifier],
                ProjectRow::from_row,
            )
            .optional()
            .context("Failed to query project by identifier")?;
        row.map(ProjectRow::into_project).transpose()
    }

    /// The explicit tab ordering, if the project ever saved one.
    pub fn get_tab_order(&self, project_id: i64) -> Result<Option<Vec<String>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT ordered_tab_identifiers FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .context("Failed to query tab order")?
            .flatten();
        raw.map(|json| serde_json::from_str(&json).context("Failed to parse tab order JSON"))
            .transpose()
    }

    pub fn set_tab_order(&self, project_id: i64, order: &[String]) -> Result<()> {
        let json = serde_json::to_string(order).context("Failed to serialize tab order")?;
        self.conn
            .execute(
                "UPDATE projects SET ordered_tab_identifiers = ?1 WHERE id = ?2",
                params![json, project_id],
            )
            .context("Failed to update tab order")?;
        Ok(())
    }

    /// Load a whole project, its users, cards and pages in one transaction.
    pub fn import_fixture(&self, fixture: &ProjectFixture) -> Result<Project> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let project = self.create_project(&fixture.identifier, &fixture.name, &fixture.schema)?;
        for user in &fixture.users {
            let name = user.name.as_deref().unwrap_or(&user.login);
            self.upsert_user(&user.login, name, user.role)?;
        }
        for card in &fixture.cards {
            self.upsert_card(&Card {
                project_id: project.id,
                number: card.number,
                name: card.name.clone(),
                card_type: card.card_type.clone(),
                properties: card.properties.clone(),
                tags: card.tags.clone(),
                trees: card.trees.clone(),
            })?;
        }
        for page in &fixture.pages {
            self.create_page(project.id, &page.name, &page.content)?;
        }

        tx.commit().context("Failed to commit project import")?;
        Ok(project)
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn upsert_user(&self, login: &str, name: &str, role: ProjectRole) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (login, name, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT(login) DO UPDATE SET name = excluded.name, role = excluded.role",
                params![login, name, role.as_str()],
            )
            .context("Failed to upsert user")?;
        self.find_user(login)?
            .context("User not found after upsert")
    }

    pub fn find_user(&self, login: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, login, name, role FROM users WHERE login = ?1",
                params![login],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query user")?;
        match row {
            Some((id, login, name, role)) => {
                let role = ProjectRole::from_str(&role)
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("Failed to parse user role")?;
                Ok(Some(User {
                    id,
                    login,
                    name,
                    role,
                }))
            }
            None => Ok(None),
        }
    }

    // ── Cards ─────────────────────────────────────────────────────────

    pub fn upsert_card(&self, card: &Card) -> Result<()> {
        let properties =
            serde_json::to_string(&card.properties).context("Failed to serialize properties")?;
        let tags = serde_json::to_string(&card.tags).context("Failed to serialize tags")?;
        let trees = serde_json::to_string(&card.trees).context("Failed to serialize trees")?;
        self.conn
            .execute(
                "INSERT INTO cards (project_id, number, name, card_type, properties, tags, trees)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(project_id, number) DO UPDATE SET
                    name = excluded.name, card_type = excluded.card_type,
                    properties = excluded.properties, tags = excluded.tags, trees = excluded.trees",
                params![
                    card.project_id,
                    card.number,
                    card.name,
                    card.card_type,
                    properties,
                    tags,
                    trees
                ],
            )
            .with_context(|| format!("Failed to upsert card #{}", card.number))?;
        Ok(())
    }

    pub fn list_cards(&self, project_id: i64) -> Result<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT project_id, number, name, card_type, properties, tags, trees
                 FROM cards WHERE project_id = ?1 ORDER BY number",
            )
            .context("Failed to prepare list_cards")?;
        let rows = stmt
            .query_map(params![project_id], CardRow::from_row)
            .context("Failed to query cards")?;
        let mut cards = Vec::new();
        for row in rows {
            let r = row.context("Failed to read card row")?;
            cards.push(r.into_card()?);
        }
        Ok(cards)
    }

    pub fn get_card(&self, project_id: i64, number: u32) -> Result<Option<Card>> {
        let row = self
            .conn
            .query_row(
                "SELECT project_id, number, name, card_type, properties, tags, trees
                 FROM cards WHERE project_id = ?1 AND number = ?2",
                params![project_id, number],
                CardRow::from_row,
            )
            .optional()
            .context("Failed to query card")?;
        row.map(CardRow::into_card).transpose()
    }

    pub fn delete_card(&self, project_id: i64, number: u32) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "DELETE FROM cards WHERE project_id = ?1 AND number = ?2",
                params![project_id, number],
            )
            .context("Failed to delete card")?;
        Ok(count > 0)
    }

    // ── Pages ─────────────────────────────────────────────────────────

    pub fn create_page(&self, project_id: i64, name: &str, content: &str) -> Result<Page> {
        let identifier = Page::identifier_for(name);
        self.conn
            .execute(
                "INSERT INTO pages (project_id, identifier, name, content) VALUES (?1, ?2, ?3, ?4)",
                params![project_id, identifier, name.trim(), content],
            )
            .with_context(|| format!("Failed to insert page {}", name))?;
        let id = self.conn.last_insert_rowid();
        self.get_page(id)?.context("Page not found after insert")
    }

    pub fn get_page(&self, id: i64) -> Result<Option<Page>> {
        self.conn
            .query_row(
                "SELECT id, project_id, identifier, name, content FROM pages WHERE id = ?1",
                params![id],
                page_from_row,
            )
            .optional()
            .context("Failed to query page")
    }

    pub fn find_page(&self, project_id: i64, identifier: &str) -> Result<Option<Page>> {
        self.conn
            .query_row(
                "SELECT id, project_id, identifier, name, content FROM pages
                 WHERE project_id = ?1 AND identifier = ?2",
                params![project_id, identifier],
                page_from_row,
            )
            .optional()
            .context("Failed to query page by identifier")
    }

    pub fn delete_page(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM pages WHERE id = ?1", params![id])
            .context("Failed to delete page")?;
        Ok(count > 0)
    }

    // ── Favorites ─────────────────────────────────────────────────────

    pub fn create_favorite(
        &self,
        project_id: i64,
        name: &str,
        favorited: &Favoritable,
        tab_view: bool,
        user_id: Option<i64>,
    ) -> Result<Favorite> {
        let json = serde_json::to_string(favorited).context("Failed to serialize favorite")?;
        self.conn
            .execute(
                "INSERT INTO favorites (project_id, name, favorited, tab_view, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![project_id, name, json, tab_view, user_id],
            )
            .context("Failed to insert favorite")?;
        let id = self.conn.last_insert_rowid();
        self.get_favorite(id)?
            .context("Favorite not found after insert")
    }

    pub fn update_favorite_target(&self, id: i64, favorited: &Favoritable) -> Result<Favorite> {
        let json = serde_json::to_string(favorited).context("Failed to serialize favorite")?;
        self.conn
            .execute(
                "UPDATE favorites SET favorited = ?1 WHERE id = ?2",
                params![json, id],
            )
            .context("Failed to update favorite")?;
        self.get_favorite(id)?
            .context("Favorite not found after update")
    }

    pub fn get_favorite(&self, id: i64) -> Result<Option<Favorite>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, name, favorited, tab_view, user_id, created_at
                 FROM favorites WHERE id = ?1",
                params![id],
                FavoriteRow::from_row,
            )
            .optional()
            .context("Failed to query favorite")?;
        row.map(FavoriteRow::into_favorite).transpose()
    }

    /// Every favorite of a project, oldest first.
    pub fn list_favorites(&self, project_id: i64) -> Result<Vec<Favorite>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, name, favorited, tab_view, user_id, created_at
                 FROM favorites WHERE project_id = ?1 ORDER BY id",
            )
            .context("Failed to prepare list_favorites")?;
        let rows = stmt
            .query_map(params![project_id], FavoriteRow::from_row)
            .context("Failed to query favorites")?;
        let mut favorites = Vec::new();
        for row in rows {
            let r = row.context("Failed to read favorite row")?;
            favorites.push(r.into_favorite()?);
        }
        Ok(favorites)
    }

    /// Flip a favorite's tab flag and store the new tab ordering together.
    pub fn set_tab_view(
        &self,
        favorite_id: i64,
        project_id: i64,
        tab_view: bool,
        order: Option<&[String]>,
    ) -> Result<Favorite> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "UPDATE favorites SET tab_view = ?1 WHERE id = ?2",
            params![tab_view, favorite_id],
        )
        .context("Failed to update tab_view")?;
        if let Some(order) = order {
            self.set_tab_order(project_id, order)?;
        }
        tx.commit().context("Failed to commit tab_view change")?;
        self.get_favorite(favorite_id)?
            .context("Favorite not found after update")
    }

    /// Rename a view favorite.
    pub fn rename_favorite(&self, id: i64, name: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE favorites SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .context("Failed to rename favorite")?;
        Ok(())
    }

    /// Rename a page tab: the page takes the new name, a stub page keeps the
    /// old identifier and the favorite follows the page. No stub is left when
    /// the identifier does not change.
    pub fn rename_page_favorite(
        &self,
        favorite: &Favorite,
        page: &Page,
        new_name: &str,
    ) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let new_identifier = Page::identifier_for(new_name);
        tx.execute(
            "UPDATE pages SET name = ?1, identifier = ?2 WHERE id = ?3",
            params![new_name, new_identifier, page.id],
        )
        .context("Failed to rename page")?;
        if new_identifier != page.identifier {
            tx.execute(
                "INSERT INTO pages (project_id, identifier, name, content) VALUES (?1, ?2, ?3, ?4)",
                params![
                    page.project_id,
                    page.identifier,
                    page.name,
                    Page::rename_stub(new_name)
                ],
            )
            .context("Failed to create renamed page stub")?;
        }

        let favorited = Favoritable::Page(PageRef {
            page_id: page.id,
            identifier: new_identifier,
        });
        let json = serde_json::to_string(&favorited).context("Failed to serialize favorite")?;
        tx.execute(
            "UPDATE favorites SET name = ?1, favorited = ?2 WHERE id = ?3",
            params![new_name, json, favorite.id],
        )
        .context("Failed to rename page favorite")?;

        tx.commit().context("Failed to commit page rename")?;
        Ok(())
    }

    /// Delete a favorite, storing the pruned tab ordering in the same
    /// transaction when one is given.
    pub fn delete_favorite(
        &self,
        id: i64,
        project_id: i64,
        pruned_order: Option<&[String]>,
    ) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let count = tx
            .execute("DELETE FROM favorites WHERE id = ?1", params![id])
            .context("Failed to delete favorite")?;
        if let Some(order) = pruned_order {
            self.set_tab_order(project_id, order)?;
        }
        tx.commit().context("Failed to commit favorite delete")?;
        Ok(count > 0)
    }

    // ── History subscriptions ─────────────────────────────────────────

    /// Insert a subscription unless an identical one exists. Returns the
    /// stored row and whether it was newly created.
    pub fn find_or_create_subscription(
        &self,
        project_id: i64,
        user_id: i64,
        filter_params: &str,
    ) -> Result<(HistorySubscription, bool)> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO history_subscriptions (project_id, user_id, filter_params)
                 VALUES (?1, ?2, ?3)",
                params![project_id, user_id, filter_params],
            )
            .context("Failed to insert history subscription")?;
        let subscription = self
            .conn
            .query_row(
                "SELECT id, project_id, user_id, filter_params, created_at FROM history_subscriptions
                 WHERE project_id = ?1 AND user_id = ?2 AND filter_params = ?3",
                params![project_id, user_id, filter_params],
                subscription_from_row,
            )
            .context("Subscription not found after insert")?;
        Ok((subscription, inserted > 0))
    }

    pub fn get_subscription(&self, id: i64) -> Result<Option<HistorySubscription>> {
        self.conn
            .query_row(
                "SELECT id, project_id, user_id, filter_params, created_at
                 FROM history_subscriptions WHERE id = ?1",
                params![id],
                subscription_from_row,
            )
            .optional()
            .context("Failed to query history subscription")
    }

    pub fn list_subscriptions(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Vec<HistorySubscription>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, project_id, user_id, filter_params, created_at FROM history_subscriptions
                 WHERE project_id = ?1 AND user_id = ?2 ORDER BY id",
            )
            .context("Failed to prepare list_subscriptions")?;
        let rows = stmt
            .query_map(params![project_id, user_id], subscription_from_row)
            .context("Failed to query history subscriptions")?;
        let mut subscriptions = Vec::new();
        for row in rows {
            subscriptions.push(row.context("Failed to read history subscription row")?);
        }
        Ok(subscriptions)
    }

    pub fn delete_subscription(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM history_subscriptions WHERE id = ?1", params![id])
            .context("Failed to delete history subscription")?;
        Ok(count > 0)
    }

    // ── Sessions ──────────────────────────────────────────────────────

    pub fn load_session(&self, session_id: &str, project_id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT state FROM sessions WHERE session_id = ?1 AND project_id = ?2",
                params![session_id, project_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query session")
    }

    pub fn save_session(&self, session_id: &str, project_id: i64, state: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sessions (session_id, project_id, state, updated_at)
                 VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(session_id, project_id) DO UPDATE SET
                    state = excluded.state, updated_at = datetime('now')",
                params![session_id, project_id, state],
            )
            .context("Failed to upsert session")?;
        Ok(())
    }

    pub fn delete_session(&self, session_id: &str, project_id: i64) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM sessions WHERE session_id = ?1 AND project_id = ?2",
                params![session_id, project_id],
            )
            .context("Failed to delete session")?;
        Ok(())
    }
}

// ── Internal row helpers ──────────────────────────────────────────────

/// Intermediate row struct for projects before the schema JSON is parsed.
struct ProjectRow {
    id: i64,
    identifier: String,
    name: String,
    schema: String,
    created_at: String,
}

impl ProjectRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            identifier: row.get(1)?,
            name: row.get(2)?,
            schema: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_project(self) -> Result<Project> {
        let schema: ProjectSchema =
            serde_json::from_str(&self.schema).context("Failed to parse project schema JSON")?;
        Ok(Project {
            id: self.id,
            identifier: self.identifier,
            name: self.name,
            schema,
            created_at: self.created_at,
        })
    }
}

struct CardRow {
    project_id: i64,
    number: u32,
    name: String,
    card_type: String,
    properties: String,
    tags: String,
    trees: String,
}

impl CardRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            project_id: row.get(0)?,
            number: row.get(1)?,
            name: row.get(2)?,
            card_type: row.get(3)?,
            properties: row.get(4)?,
            tags: row.get(5)?,
            trees: row.get(6)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        Ok(Card {
            project_id: self.project_id,
            number: self.number,
            name: self.name,
            card_type: self.card_type,
            properties: serde_json::from_str(&self.properties)
                .context("Failed to parse card properties JSON")?,
            tags: serde_json::from_str(&self.tags).context("Failed to parse card tags JSON")?,
            trees: serde_json::from_str(&self.trees).context("Failed to parse card trees JSON")?,
        })
    }
}

struct FavoriteRow {
    id: i64,
    project_id: i64,
    name: String,
    favorited: String,
    tab_view: bool,
    user_id: Option<i64>,
    created_at: String,
}

impl FavoriteRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            favorited: row.get(3)?,
            tab_view: row.get(4)?,
            user_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_favorite(self) -> Result<Favorite> {
        let favorited: Favoritable =
            serde_json::from_str(&self.favorited).context("Failed to parse favorite JSON")?;
        Ok(Favorite {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            favorited,
            tab_view: self.tab_view,
            user_id: self.user_id,
            created_at: self.created_at,
        })
    }
}

fn page_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        project_id: row.get(1)?,
        identifier: row.get(2)?,
        name: row.get(3)?,
        content: row.get(4)?,
    })
}

fn subscription_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistorySubscription> {
    Ok(HistorySubscription {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        filter_params: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
