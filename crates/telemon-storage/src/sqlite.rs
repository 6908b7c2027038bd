use crate::error::{Result, StorageError};
use crate::MetricStore;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use telemon_common::metric::{Metric, MetricKind, MetricValue};

// The value column carries no type affinity: counters bind as SQLite
// integers so `value = value + ?` stays exact past 2^53, gauges as reals.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS metrics (
    id    TEXT PRIMARY KEY,
    type  TEXT NOT NULL,
    value NOT NULL
)";

/// SQLite-backed metric store. Every write is durable on return, so the
/// snapshot hooks are no-ops.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn stored_kind(conn: &Connection, id: &str) -> Result<Option<MetricKind>> {
        let raw: Option<String> = conn
            .query_row("SELECT type FROM metrics WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(raw.parse().map_err(|_| StorageError::InvalidKind {
                id: id.to_string(),
                raw: raw.clone(),
            })?)),
            None => Ok(None),
        }
    }
}

impl MetricStore for SqliteStore {
    fn exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM metrics WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, metric: Metric) -> Result<()> {
        let value = match metric.value {
            MetricValue::Counter(v) => SqlValue::Integer(v),
            MetricValue::Gauge(v) => SqlValue::Real(v),
        };
        self.conn().execute(
            "INSERT INTO metrics (id, type, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET type = excluded.type, value = excluded.value",
            params![metric.id, metric.kind().to_string(), value],
        )?;
        Ok(())
    }

    fn update(&self, id: &str, change: MetricValue) -> Result<()> {
        let conn = self.conn();
        // Counters increment in a single statement so concurrent deltas
        // cannot lose updates; gauges overwrite, which needs no such care.
        let updated = match change {
            MetricValue::Counter(delta) => conn.execute(
                "UPDATE metrics SET value = value + ?1 WHERE id = ?2 AND type = 'counter'",
                params![delta, id],
            )?,
            MetricValue::Gauge(value) => conn.execute(
                "UPDATE metrics SET value = ?1 WHERE id = ?2 AND type = 'gauge'",
                params![value, id],
            )?,
        };
        if updated > 0 {
            return Ok(());
        }
        match Self::stored_kind(&conn, id)? {
            Some(stored) => Err(StorageError::KindMismatch {
                id: id.to_string(),
                stored,
                requested: change.kind(),
            }),
            None => Err(StorageError::NotFound {
                id: id.to_string(),
            }),
        }
    }

    fn value(&self, kind: MetricKind, id: &str) -> Result<String> {
        let conn = self.conn();
        let query = "SELECT value FROM metrics WHERE id = ?1 AND type = ?2";
        let args = params![id, kind.to_string()];
        let rendered = match kind {
            MetricKind::Counter => conn
                .query_row(query, args, |r| r.get::<_, i64>(0))
                .optional()?
                .map(|v| MetricValue::Counter(v).render()),
            MetricKind::Gauge => conn
                .query_row(query, args, |r| r.get::<_, f64>(0))
                .optional()?
                .map(|v| MetricValue::Gauge(v).render()),
        };
        rendered.ok_or_else(|| StorageError::NotFound {
            id: id.to_string(),
        })
    }

    fn list_all(&self) -> Result<BTreeMap<String, Metric>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, type, value FROM metrics ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let kind: String = row.get(1)?;
            let value = match kind.as_str() {
                "counter" => MetricValue::Counter(row.get(2)?),
                _ => MetricValue::Gauge(row.get(2)?),
            };
            Ok((id, kind, value))
        })?;
        let mut all = BTreeMap::new();
        for row in rows {
            let (id, kind, value) = row?;
            if kind.parse::<MetricKind>().is_err() {
                return Err(StorageError::InvalidKind { id, raw: kind });
            }
            all.insert(id.clone(), Metric { id, value });
        }
        Ok(all)
    }

    fn ping(&self) -> Result<()> {
        self.conn().query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn load(&self) -> Result<()> {
        Ok(())
    }
}
