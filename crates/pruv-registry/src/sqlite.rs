//! SQLite implementation of the Registry trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pruv_core::{now_millis, Chain};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{RegistryError, Result};
use crate::migration;
use crate::traits::{Entity, Record, Registry};

/// A shared SQLite database holding records of every kind.
///
/// Cloning is cheap; all clones share one connection behind a mutex.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A typed registry over this database for entity kind `M`.
    pub fn registry<M: Entity>(&self) -> SqliteRegistry<M> {
        SqliteRegistry {
            db: self.clone(),
            _marker: PhantomData,
        }
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| RegistryError::Database(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| RegistryError::TaskFailed(e.to_string()))?
    }
}

/// Registry for one entity kind, backed by a [`SqliteDatabase`].
pub struct SqliteRegistry<M> {
    db: SqliteDatabase,
    _marker: PhantomData<fn() -> M>,
}

impl<M: Entity> SqliteRegistry<M> {
    /// Open a database file and return a registry over it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(SqliteDatabase::open(path)?.registry())
    }

    /// Open an in-memory database and return a registry over it.
    pub fn open_memory() -> Result<Self> {
        Ok(SqliteDatabase::open_memory()?.registry())
    }
}

/// A record encoded for storage.
struct EncodedRecord {
    id: String,
    metadata: String,
    chain: String,
    chain_length: i64,
    head: String,
}

impl EncodedRecord {
    fn encode<M: Entity>(metadata: &M, chain: &Chain) -> Result<Self> {
        Ok(Self {
            id: metadata.id().to_string(),
            metadata: serde_json::to_string(metadata)?,
            chain: serde_json::to_string(chain)?,
            chain_length: chain.len() as i64,
            head: chain.head().to_string(),
        })
    }
}

fn upsert(conn: &Connection, kind: &str, record: &EncodedRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO records (kind, id, metadata, chain, chain_length, head, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(kind, id) DO UPDATE SET
             metadata = excluded.metadata,
             chain = excluded.chain,
             chain_length = excluded.chain_length,
             head = excluded.head,
             updated_at = excluded.updated_at",
        params![
            kind,
            record.id,
            record.metadata,
            record.chain,
            record.chain_length,
            record.head,
            now_millis(),
        ],
    )?;
    Ok(())
}

fn stored_length(conn: &Connection, kind: &str, id: &str) -> Result<Option<usize>> {
    let length: Option<i64> = conn
        .query_row(
            "SELECT chain_length FROM records WHERE kind = ?1 AND id = ?2",
            params![kind, id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(length.map(|n| n as usize))
}

#[async_trait]
impl<M: Entity> Registry<M> for SqliteRegistry<M> {
    async fn save(&self, metadata: &M, chain: &Chain) -> Result<()> {
        let record = EncodedRecord::encode(metadata, chain)?;

        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;
                upsert(&tx, M::KIND, &record)?;
                tx.commit()?;
                tracing::debug!(
                    kind = M::KIND,
                    id = %record.id,
                    len = record.chain_length,
                    "record saved"
                );
                Ok(())
            })
            .await
    }

    async fn save_if(
        &self,
        metadata: &M,
        chain: &Chain,
        expected_len: Option<usize>,
    ) -> Result<()> {
        let record = EncodedRecord::encode(metadata, chain)?;

        self.db
            .run(move |conn| {
                let tx = conn.transaction()?;

                let found = stored_length(&tx, M::KIND, &record.id)?;
                if found != expected_len {
                    return Err(RegistryError::Conflict {
                        id: record.id,
                        expected: expected_len,
                        found,
                    });
                }

                upsert(&tx, M::KIND, &record)?;
                tx.commit()?;
                tracing::debug!(
                    kind = M::KIND,
                    id = %record.id,
                    len = record.chain_length,
                    "record saved"
                );
                Ok(())
            })
            .await
    }

    async fn load(&self, id: &str) -> Result<Option<Record<M>>> {
        let id = id.to_string();

        let row: Option<(String, String)> = self
            .db
            .run(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT metadata, chain FROM records WHERE kind = ?1 AND id = ?2",
                        params![M::KIND, id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            Some((metadata, chain)) => Ok(Some(Record {
                metadata: serde_json::from_str(&metadata)?,
                chain: serde_json::from_str(&chain)?,
            })),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let id = id.to_string();

        self.db
            .run(move |conn| {
                let found: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM records WHERE kind = ?1 AND id = ?2",
                        params![M::KIND, id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    async fn list_all(&self) -> Result<Vec<M>> {
        let rows: Vec<String> = self
            .db
            .run(|conn| {
                let mut stmt =
                    conn.prepare("SELECT metadata FROM records WHERE kind = ?1 ORDER BY id")?;
                let rows = stmt
                    .query_map(params![M::KIND], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(rows)
            })
            .await?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(RegistryError::from))
            .collect()
    }
}
