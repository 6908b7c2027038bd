use crate::error::{Result, StorageError};
use crate::MetricStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::RwLock;
use telemon_common::metric::{Metric, MetricKind, MetricValue};

/// On-disk snapshot record for a single metric. Counters serialize their
/// integer exactly; `serde_json::Number` keeps both kinds lossless in one
/// field.
#[derive(Debug, Serialize, Deserialize)]
struct MetricRecord {
    id: String,
    #[serde(rename = "type")]
    kind: MetricKind,
    value: serde_json::Number,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    metrics: HashMap<String, MetricRecord>,
}

impl MetricRecord {
    fn from_metric(metric: &Metric) -> Self {
        let value = match metric.value {
            MetricValue::Counter(v) => serde_json::Number::from(v),
            // Metric values are never NaN or infinite, so from_f64 cannot
            // fail; fall back to zero rather than corrupt the snapshot.
            MetricValue::Gauge(v) => {
                serde_json::Number::from_f64(v).unwrap_or_else(|| serde_json::Number::from(0))
            }
        };
        Self {
            id: metric.id.clone(),
            kind: metric.kind(),
            value,
        }
    }

    fn into_metric(self) -> Result<Metric> {
        let value = match self.kind {
            MetricKind::Counter => {
                let v = self.value.as_i64().ok_or_else(|| {
                    StorageError::Json(serde::de::Error::custom(format!(
                        "counter '{}' has a non-integer value",
                        self.id
                    )))
                })?;
                MetricValue::Counter(v)
            }
            MetricKind::Gauge => {
                let v = self.value.as_f64().ok_or_else(|| {
                    StorageError::Json(serde::de::Error::custom(format!(
                        "gauge '{}' has a non-numeric value",
                        self.id
                    )))
                })?;
                MetricValue::Gauge(v)
            }
        };
        Ok(Metric { id: self.id, value })
    }
}

/// In-memory metric store with an optional JSON snapshot file.
pub struct MemoryStore {
    metrics: RwLock<HashMap<String, Metric>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            snapshot_path: Some(path.into()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Metric>> {
        self.metrics.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Metric>> {
        self.metrics.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore for MemoryStore {
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.read().contains_key(id))
    }

    fn insert(&self, metric: Metric) -> Result<()> {
        self.write().insert(metric.id.clone(), metric);
        Ok(())
    }

    fn update(&self, id: &str, change: MetricValue) -> Result<()> {
        let mut metrics = self.write();
        let metric = metrics.get_mut(id).ok_or_else(|| StorageError::NotFound {
            id: id.to_string(),
        })?;
        let stored = metric.kind();
        if !metric.apply(change) {
            return Err(StorageError::KindMismatch {
                id: id.to_string(),
                stored,
                requested: change.kind(),
            });
        }
        Ok(())
    }

    fn value(&self, kind: MetricKind, id: &str) -> Result<String> {
        let metrics = self.read();
        match metrics.get(id) {
            Some(metric) if metric.kind() == kind => Ok(metric.render_value()),
            _ => Err(StorageError::NotFound {
                id: id.to_string(),
            }),
        }
    }

    fn list_all(&self) -> Result<BTreeMap<String, Metric>> {
        Ok(self
            .read()
            .iter()
            .map(|(id, metric)| (id.clone(), metric.clone()))
            .collect())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            metrics: self
                .read()
                .iter()
                .map(|(id, metric)| (id.clone(), MetricRecord::from_metric(metric)))
                .collect(),
        };
        let json = serde_json::to_vec(&snapshot)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), count = snapshot.metrics.len(), "snapshot written");
        Ok(())
    }

    fn load(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let json = match std::fs::read(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&json)?;
        let mut restored = HashMap::with_capacity(snapshot.metrics.len());
        for (id, record) in snapshot.metrics {
            restored.insert(id, record.into_metric()?);
        }
        let count = restored.len();
        *self.write() = restored;
        tracing::info!(path = %path.display(), count, "snapshot restored");
        Ok(())
    }
}
