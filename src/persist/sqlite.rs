//! SQLite-backed document store with JSON text bodies.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use serde_json::Value;

use crate::types::DocId;

use super::{DocumentStore, Filter, IndexSpec, PersistError, PersistResult};

/// SQLite implementation of [`DocumentStore`].
///
/// Filters are evaluated in process over the collection's bodies; rows are
/// returned in insertion order. Declared indexes become partial expression
/// indexes over `json_extract(body, ..)`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Checkpoints the WAL into the main database file.
    pub fn flush(&self) -> PersistResult<()> {
        self.lock()?
            .execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn lock(&self) -> PersistResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PersistError::Message("sqlite connection lock poisoned".to_string()))
    }
}

impl DocumentStore for SqliteStore {
    fn upsert(&self, collection: &str, id: &DocId, body: &Value) -> PersistResult<()> {
        let body = serde_json::to_string(body)?;
        self.lock()?
            .execute(
                "INSERT INTO documents(collection, id, body, updated_ms) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_ms = excluded.updated_ms",
                params![collection, id.as_str(), body, now_ms() as i64],
            )
            .map_err(|err| duplicate_key(err, collection))?;
        Ok(())
    }

    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> PersistResult<()> {
        self.lock()?
            .execute_batch(&index_sql(collection, index))
            .map_err(|err| duplicate_key(err, collection))
    }

    fn remove(&self, collection: &str, id: &DocId) -> PersistResult<bool> {
        let count = self.lock()?.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id.as_str()],
        )?;
        Ok(count > 0)
    }

    fn find_by_id(&self, collection: &str, id: &DocId) -> PersistResult<Option<Value>> {
        let body: Option<String> = self
            .lock()?
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn find(&self, collection: &str, filter: &Filter) -> PersistResult<Vec<Value>> {
        let conn = self.lock()?;
        Ok(load_matching(&conn, collection, filter)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    fn remove_where(&self, collection: &str, filter: &Filter) -> PersistResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let ids: Vec<String> = load_matching(&tx, collection, filter)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        {
            let mut stmt = tx.prepare("DELETE FROM documents WHERE collection = ?1 AND id = ?2")?;
            for id in &ids {
                stmt.execute(params![collection, id])?;
            }
        }
        tx.commit()?;
        Ok(ids.len())
    }

    fn modify_where(
        &self,
        collection: &str,
        filter: &Filter,
        edit: &mut dyn FnMut(&mut Value),
    ) -> PersistResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let matched = load_matching(&tx, collection, filter)?;
        write_back(&tx, collection, &matched, edit)?;
        tx.commit()?;
        Ok(matched.len())
    }
}

fn load_matching(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
) -> PersistResult<Vec<(String, Value)>> {
    let mut stmt =
        conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid ASC")?;
    let rows = stmt.query_map(params![collection], |row| {
        let id: String = row.get(0)?;
        let body: String = row.get(1)?;
        Ok((id, body))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, body) = row?;
        let doc: Value = serde_json::from_str(&body)?;
        if filter.matches(&doc) {
            out.push((id, doc));
        }
    }
    Ok(out)
}

fn write_back(
    tx: &Transaction<'_>,
    collection: &str,
    matched: &[(String, Value)],
    edit: &mut dyn FnMut(&mut Value),
) -> PersistResult<()> {
    let mut stmt = tx.prepare(
        "UPDATE documents SET body = ?3, updated_ms = ?4 WHERE collection = ?1 AND id = ?2",
    )?;
    let ts_ms = now_ms() as i64;
    for (id, doc) in matched {
        let mut doc = doc.clone();
        edit(&mut doc);
        stmt.execute(params![collection, id, serde_json::to_string(&doc)?, ts_ms])
            .map_err(|err| duplicate_key(err, collection))?;
    }
    Ok(())
}

fn index_sql(collection: &str, index: &IndexSpec) -> String {
    let columns: Vec<String> = index
        .fields()
        .iter()
        .map(|field| format!("json_extract(body, '$.{}')", field.replace('\'', "''")))
        .collect();
    format!(
        "CREATE {unique}INDEX IF NOT EXISTS \"{name}\" ON documents({columns}) WHERE collection = '{collection}';",
        unique = if index.is_unique() { "UNIQUE " } else { "" },
        name = index.qualified_name(collection),
        columns = columns.join(", "),
        collection = collection.replace('\'', "''"),
    )
}

/// Maps unique constraint failures to [`PersistError::DuplicateKey`].
fn duplicate_key(err: rusqlite::Error, collection: &str) -> PersistError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        // "UNIQUE constraint failed: index 'doc_users_email'"
        if failure.code == ErrorCode::ConstraintViolation && message.starts_with("UNIQUE") {
            return PersistError::DuplicateKey {
                collection: collection.to_string(),
                index: message.split('\'').nth(1).unwrap_or("unknown").to_string(),
            };
        }
    }
    err.into()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
