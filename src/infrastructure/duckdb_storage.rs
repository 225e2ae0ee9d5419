use crate::infrastructure::storage::{KeyValueStore, Scope};
use anyhow::{Context, Result, anyhow};
use duckdb::{Connection, OptionalExt, params};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Schema migrations of the backing database, applied in order.
const MIGRATIONS: [(i32, &str, &str); 1] = [(
    1,
    "001_create_kv_store",
    include_str!("../../migrations/001_create_kv_store.sql"),
)];

pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open DuckDB connection")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to create in-memory DuckDB connection")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.setup_migration_system()?;
        self.run_migrations()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("DuckDB connection lock poisoned"))
    }

    fn decode(key: &str, raw: &str) -> Result<Value> {
        serde_json::from_str(raw)
            .with_context(|| format!("Failed to decode stored value for {}", key))
    }
}

impl KeyValueStore for DuckDbStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE scope = ? AND key = ?",
                params![scope.as_str(), key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read key")?;

        raw.map(|raw| Self::decode(key, &raw)).transpose()
    }

    fn set_many(&self, scope: Scope, entries: Map<String, Value>) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        for (key, value) in &entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv_store (scope, key, value) VALUES (?, ?, ?)",
                params![scope.as_str(), key, value.to_string()],
            )
            .with_context(|| format!("Failed to write {}", key))?;
        }

        tx.commit().context("Failed to commit write")?;
        log::debug!("wrote {} key(s) to {} scope", entries.len(), scope);
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM kv_store WHERE scope = ? AND key = ?",
            params![scope.as_str(), key],
        )
        .context("Failed to delete key")?;
        Ok(())
    }

    fn snapshot(&self, scope: Scope) -> Result<Map<String, Value>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM kv_store WHERE scope = ? ORDER BY key")
            .context("Failed to prepare select statement")?;

        let rows = stmt.query_map(params![scope.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = Map::new();
        for row in rows {
            let (key, raw) = row?;
            let value = Self::decode(&key, &raw)?;
            map.insert(key, value);
        }

        Ok(map)
    }

    fn clear(&self, scope: Scope) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_store WHERE scope = ?", params![scope.as_str()])
            .context("Failed to clear scope")?;
        Ok(())
    }

    fn backend_info(&self) -> &str {
        "DuckDB Storage Backend v1.0"
    }
}

impl DuckDbStore {
    fn setup_migration_system(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        )
        .context("Failed to create migrations table")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        let applied = self.get_applied_migrations()?;

        for (version, name, sql_content) in MIGRATIONS {
            if !applied.contains(&version) {
                self.apply_migration(version, name, sql_content)
                    .with_context(|| format!("Failed to apply migration {}: {}", version, name))?;
            }
        }

        Ok(())
    }

    fn get_applied_migrations(&self) -> Result<HashSet<i32>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT version FROM migrations ORDER BY version")
            .context("Failed to prepare migration query")?;

        let rows = stmt.query_map([], |row| row.get::<_, i32>(0))?;

        let mut applied = HashSet::new();
        for version in rows {
            applied.insert(version?);
        }

        Ok(applied)
    }

    fn apply_migration(&self, version: i32, name: &str, sql_content: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(sql_content)
            .with_context(|| format!("Failed to execute migration SQL for {}", name))?;

        conn.execute(
            "INSERT INTO migrations (version, name) VALUES (?, ?)",
            params![version, name],
        )
        .with_context(|| format!("Failed to record migration {} as applied", name))?;

        log::info!("applied storage migration {}", name);
        Ok(())
    }
}
