use crate::error::StoreError;
use crate::RuleStore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use vigil_common::Rule;

/// SQLite-backed [`RuleStore`].
///
/// One table per collection: `id INTEGER PRIMARY KEY` (assigned by SQLite)
/// plus the JSON document body. The id column is the single source of truth;
/// bodies are written with the id stripped.
pub struct SqliteRuleStore {
    conn: Mutex<Option<Connection>>,
    collection: String,
}

impl SqliteRuleStore {
    /// Opens (or creates) the database file at `db_path` and ensures the
    /// collection table exists. Parent directories are created as needed.
    pub fn open(db_path: &Path, collection: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(db_path)?, collection)
    }

    /// An in-memory store, used by tests and throwaway setups.
    pub fn open_in_memory(collection: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        Self::init(Connection::open_in_memory()?, collection)
    }

    fn init(conn: Connection, collection: &str) -> Result<Self, StoreError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body TEXT NOT NULL
            );"
        ))?;
        Ok(SqliteRuleStore {
            conn: Mutex::new(Some(conn)),
            collection: collection.to_string(),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StoreError::Closed),
        }
    }

    fn encode(rule: &Rule) -> Result<String, StoreError> {
        let mut doc = rule.clone();
        doc.id = 0;
        Ok(serde_json::to_string(&doc).map_err(vigil_common::RuleError::from)?)
    }
}

impl RuleStore for SqliteRuleStore {
    fn get_all(&self) -> Result<Vec<Rule>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT id, body FROM {} ORDER BY id",
                self.collection
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut rules = Vec::new();
            for row in rows {
                let (id, body) = row?;
                match Rule::from_json(body.as_bytes()) {
                    Ok(mut rule) => {
                        rule.id = id;
                        rules.push(rule);
                    }
                    Err(e) => {
                        tracing::warn!(id, error = %e, "Skipping undecodable rule document");
                    }
                }
            }
            Ok(rules)
        })
    }

    fn get(&self, id: i64) -> Result<Option<Rule>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT body FROM {} WHERE id = ?1",
                self.collection
            ))?;
            let body: Option<String> = stmt
                .query_row(params![id], |row| row.get(0))
                .optional()?;

            match body {
                Some(body) => {
                    let mut rule = Rule::from_json(body.as_bytes())?;
                    rule.id = id;
                    Ok(Some(rule))
                }
                None => Ok(None),
            }
        })
    }

    fn insert(&self, rule: &Rule) -> Result<i64, StoreError> {
        let body = Self::encode(rule)?;
        self.with_conn(|conn| {
            conn.prepare_cached(&format!("INSERT INTO {} (body) VALUES (?1)", self.collection))?
                .execute(params![body])?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update(&self, id: i64, rule: &Rule) -> Result<(), StoreError> {
        let body = Self::encode(rule)?;
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached(&format!(
                    "UPDATE {} SET body = ?1 WHERE id = ?2",
                    self.collection
                ))?
                .execute(params![body, id])?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached(&format!("DELETE FROM {} WHERE id = ?1", self.collection))?
                .execute(params![id])?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn close(&self) {
        let mut guard = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let mut chars = collection.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(collection.to_string()))
    }
}
