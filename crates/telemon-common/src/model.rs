use crate::metric::{parse_counter_value, MetricKind, MetricValue};
use serde::{Deserialize, Serialize};

/// The JSON wire document for a single metric update or read, shared by the
/// `/update/`, `/updates/`, and `/value/` endpoints.
///
/// `kind` stays a plain string here so that handlers can validate it per
/// entry; a batch must stop at the first invalid kind while leaving the
/// already-processed prefix applied, which a strongly typed field would turn
/// into a whole-document parse failure instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl MetricUpdate {
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter.to_string(),
            delta: Some(delta),
            value: None,
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge.to_string(),
            delta: None,
            value: Some(value),
        }
    }

    /// Validates the declared kind and extracts the typed change value.
    pub fn change(&self) -> Result<MetricValue, String> {
        let kind: MetricKind = self.kind.parse()?;
        match kind {
            MetricKind::Counter => {
                let delta = self
                    .delta
                    .ok_or_else(|| format!("counter update for '{}' is missing delta", self.id))?;
                Ok(MetricValue::Counter(delta))
            }
            MetricKind::Gauge => {
                let value = self
                    .value
                    .ok_or_else(|| format!("gauge update for '{}' is missing value", self.id))?;
                Ok(MetricValue::Gauge(value))
            }
        }
    }
}

/// Parses a textual `(kind, value)` pair from the path-style update endpoint.
pub fn parse_path_change(kind: MetricKind, raw: &str) -> Result<MetricValue, String> {
    match kind {
        MetricKind::Counter => parse_counter_value(raw).map(MetricValue::Counter),
        MetricKind::Gauge => raw
            .parse::<f64>()
            .map(MetricValue::Gauge)
            .map_err(|_| format!("invalid gauge value: {raw}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_field_is_absent_from_json() {
        let update = MetricUpdate::counter("requests", 5);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"id":"requests","type":"counter","delta":5}"#);

        let update = MetricUpdate::gauge("temp", 36.6);
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"id":"temp","type":"gauge","value":36.6}"#);
    }

    #[test]
    fn change_requires_matching_field() {
        let missing = MetricUpdate {
            id: "requests".into(),
            kind: "counter".into(),
            delta: None,
            value: Some(1.0),
        };
        assert!(missing.change().is_err());

        let ok = MetricUpdate::counter("requests", 3);
        assert_eq!(ok.change().unwrap(), MetricValue::Counter(3));
    }

    #[test]
    fn change_rejects_unknown_kind() {
        let update = MetricUpdate {
            id: "x".into(),
            kind: "histogram".into(),
            delta: None,
            value: None,
        };
        assert!(update.change().is_err());
    }

    #[test]
    fn path_change_parses_by_kind() {
        assert_eq!(
            parse_path_change(MetricKind::Gauge, "36.6").unwrap(),
            MetricValue::Gauge(36.6)
        );
        assert_eq!(
            parse_path_change(MetricKind::Counter, "8").unwrap(),
            MetricValue::Counter(8)
        );
        assert!(parse_path_change(MetricKind::Counter, "8.5").is_err());
    }
}
