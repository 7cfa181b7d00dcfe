use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::models::entities::{Entity, EntityId, EntityKind};
use crate::models::errors::CommitError;
use crate::storage::EntityStore;

/// Durable entity store backed by an embedded sqlite database.
///
/// Entities are stored as one row per id with the scan keys broken out into
/// indexed columns and the full record as a JSON payload. Writes go through
/// WAL, so an `upsert` that returned `Ok` is on disk before the cursor update
/// that follows it in the same connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, CommitError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("sqlite connection mutex poisoned")
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entities (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            block_number INTEGER NOT NULL,
            log_index INTEGER NOT NULL,
            block_timestamp TEXT NOT NULL,
            tx_hash TEXT NOT NULL,
            payload_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entities_kind_block
            ON entities(kind, block_number, log_index);

        CREATE TABLE IF NOT EXISTS ingestion_cursor (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            last_processed_block INTEGER NOT NULL
        );
        ",
    )?;

    Ok(())
}

impl EntityStore for SqliteStore {
    fn upsert(&self, entity: &Entity) -> Result<(), CommitError> {
        let meta = entity.meta();
        let payload = serde_json::to_string(entity).map_err(CommitError::Serialize)?;

        self.conn().execute(
            "INSERT INTO entities (id, kind, block_number, log_index, block_timestamp, tx_hash, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                block_number = excluded.block_number,
                log_index = excluded.log_index,
                block_timestamp = excluded.block_timestamp,
                tx_hash = excluded.tx_hash,
                payload_json = excluded.payload_json",
            params![
                meta.id.as_str(),
                entity.kind().as_str(),
                meta.block_number as i64,
                meta.log_index as i64,
                meta.block_timestamp.to_rfc3339(),
                meta.tx_hash.to_string(),
                payload,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &EntityId) -> Result<Option<Entity>, CommitError> {
        let payload: Option<String> = self
            .conn()
            .query_row(
                "SELECT payload_json FROM entities WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|source| CommitError::CorruptPayload {
                    id: id.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn scan_by_block_range(
        &self,
        kind: EntityKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Entity>, CommitError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, payload_json FROM entities
             WHERE kind = ?1 AND block_number BETWEEN ?2 AND ?3
             ORDER BY block_number ASC, log_index ASC",
        )?;

        let rows = stmt
            .query_map(
                params![kind.as_str(), from_block as i64, to_block as i64],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, payload)| {
                serde_json::from_str(&payload)
                    .map_err(|source| CommitError::CorruptPayload { id, source })
            })
            .collect()
    }

    fn last_processed_block(&self) -> Result<Option<u64>, CommitError> {
        let block: Option<i64> = self
            .conn()
            .query_row(
                "SELECT last_processed_block FROM ingestion_cursor WHERE id = 0",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block.map(|b| b as u64))
    }

    fn set_last_processed_block(&self, block: u64) -> Result<(), CommitError> {
        self.conn().execute(
            "INSERT INTO ingestion_cursor (id, last_processed_block) VALUES (0, ?1)
             ON CONFLICT(id) DO UPDATE SET last_processed_block = excluded.last_processed_block",
            params![block as i64],
        )?;
        Ok(())
    }
}
