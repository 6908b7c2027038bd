use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two metric kinds the pipeline understands.
///
/// # Examples
///
/// ```
/// use telemon_common::metric::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            _ => Err(format!("unknown metric kind: {s}")),
        }
    }
}

/// A typed metric payload: counters accumulate `i64` deltas, gauges hold the
/// last written `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(i64),
    Gauge(f64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// A zero value of the given kind, used by the two-step
    /// create-then-update protocol.
    pub fn zero(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => MetricValue::Counter(0),
            MetricKind::Gauge => MetricValue::Gauge(0.0),
        }
    }

    /// Renders the value the way listings and read responses expect:
    /// counters as plain integers, gauges with the shortest representation
    /// that round-trips.
    pub fn render(&self) -> String {
        match self {
            MetricValue::Counter(v) => format!("{v}"),
            MetricValue::Gauge(v) => format!("{v}"),
        }
    }
}

/// A single metric with a stable identity and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub id: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn counter(id: impl Into<String>, value: i64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Counter(value),
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn zero(kind: MetricKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::zero(kind),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Applies an update: counters add the delta, gauges replace the value.
    /// Returns `false` when the update kind does not match the stored kind;
    /// callers must reject the update, never coerce it. Counter totals
    /// saturate at the `i64` bounds instead of wrapping.
    pub fn apply(&mut self, change: MetricValue) -> bool {
        match (&mut self.value, change) {
            (MetricValue::Counter(current), MetricValue::Counter(delta)) => {
                *current = current.saturating_add(delta);
                true
            }
            (MetricValue::Gauge(current), MetricValue::Gauge(value)) => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    pub fn render_value(&self) -> String {
        self.value.render()
    }

    /// Canonical listing form: `"<kind>:<id>:<value>"`.
    pub fn render(&self) -> String {
        format!("{}:{}:{}", self.kind(), self.id, self.render_value())
    }
}

/// Parses a counter delta, accepting exponent notation (`"1e+5"`) the way
/// the original agent emits large values.
pub fn parse_counter_value(raw: &str) -> Result<i64, String> {
    if raw.contains('e') || raw.contains('E') {
        let parsed: f64 = raw
            .parse()
            .map_err(|_| format!("invalid counter value: {raw}"))?;
        if !parsed.is_finite() {
            return Err(format!("invalid counter value: {raw}"));
        }
        return Ok(parsed as i64);
    }
    raw.parse()
        .map_err(|_| format!("invalid counter value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_and_renders() {
        assert_eq!("gauge".parse::<MetricKind>().unwrap(), MetricKind::Gauge);
        assert!("histogram".parse::<MetricKind>().is_err());
        assert_eq!(MetricKind::Counter.to_string(), "counter");
    }

    #[test]
    fn counter_accumulates_deltas() {
        let mut m = Metric::counter("requests", 0);
        for delta in [5, 3, 7] {
            assert!(m.apply(MetricValue::Counter(delta)));
        }
        assert_eq!(m.render_value(), "15");
        assert_eq!(m.render(), "counter:requests:15");
    }

    #[test]
    fn gauge_last_write_wins() {
        let mut m = Metric::gauge("temp", 0.0);
        assert!(m.apply(MetricValue::Gauge(36.6)));
        assert!(m.apply(MetricValue::Gauge(37.1)));
        assert_eq!(m.render_value(), "37.1");
        assert_eq!(m.render(), "gauge:temp:37.1");
    }

    #[test]
    fn counter_saturates_at_i64_bounds() {
        let mut m = Metric::counter("requests", i64::MAX);
        assert!(m.apply(MetricValue::Counter(1)));
        assert_eq!(m.render_value(), i64::MAX.to_string());

        let mut m = Metric::counter("drift", i64::MIN);
        assert!(m.apply(MetricValue::Counter(-1)));
        assert_eq!(m.render_value(), i64::MIN.to_string());
    }

    #[test]
    fn apply_rejects_kind_mismatch() {
        let mut m = Metric::counter("requests", 4);
        assert!(!m.apply(MetricValue::Gauge(1.0)));
        assert_eq!(m.render_value(), "4");
    }

    #[test]
    fn gauge_renders_without_trailing_zeros() {
        let m = Metric::gauge("ratio", 0.5);
        assert_eq!(m.render_value(), "0.5");
        let whole = Metric::gauge("whole", 4.0);
        assert_eq!(whole.render_value(), "4");
    }

    #[test]
    fn counter_value_accepts_exponent_notation() {
        assert_eq!(parse_counter_value("100000").unwrap(), 100_000);
        assert_eq!(parse_counter_value("1e+5").unwrap(), 100_000);
        assert!(parse_counter_value("ten").is_err());
    }
}
