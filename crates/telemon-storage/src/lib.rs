//! Metric persistence layer.
//!
//! Two backends implement [`MetricStore`]: the in-memory
//! [`memory::MemoryStore`] with optional JSON snapshots, and the SQLite-backed
//! [`sqlite::SqliteStore`]. The server picks one at startup from its
//! configuration; everything above this crate works against the trait object.

pub mod error;
pub mod memory;
pub mod sqlite;


use error::Result;
use std::collections::BTreeMap;
use telemon_common::metric::{Metric, MetricKind, MetricValue};

/// Persistence backend for metrics.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is accessed from the HTTP handlers, the gRPC service,
/// and the snapshot task concurrently.
///
/// Writes follow a two-step lifecycle: callers check [`exists`](Self::exists),
/// [`insert`](Self::insert) a zero-valued metric if needed, then
/// [`update`](Self::update) with the change. Counters accumulate deltas,
/// gauges replace their value.
pub trait MetricStore: Send + Sync {
    /// Reports whether a metric with this id is stored, regardless of kind.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Stores a metric, replacing any previous entry with the same id.
    fn insert(&self, metric: Metric) -> Result<()>;

    /// Applies a change to an existing metric. Fails with
    /// [`StorageError::NotFound`](error::StorageError::NotFound) when the id
    /// is absent and with
    /// [`StorageError::KindMismatch`](error::StorageError::KindMismatch) when
    /// the change's kind disagrees with the stored metric.
    fn update(&self, id: &str, change: MetricValue) -> Result<()>;

    /// Returns the rendered value of a metric. A stored metric of a different
    /// kind reads as not found.
    fn value(&self, kind: MetricKind, id: &str) -> Result<String>;

    /// Returns a copy of every stored metric, keyed and ordered by id.
    /// Mutating the returned map never affects the store.
    fn list_all(&self) -> Result<BTreeMap<String, Metric>>;

    /// Checks that the backend is reachable.
    fn ping(&self) -> Result<()>;

    /// Persists the current state to the configured snapshot, if any.
    /// Backends with durable writes treat this as a no-op.
    fn save(&self) -> Result<()>;

    /// Restores state from the configured snapshot, if any. A missing
    /// snapshot file is not an error.
    fn load(&self) -> Result<()>;
}
