//! Shot document model
//!
//! The JSON document uploaded by the espresso machine plugin. Only the keys
//! needed for the receipt are modelled; everything else is ignored.
//!
//! ```json
//! {
//!   "elapsed": [0.0, 0.25, ...],
//!   "pressure": { "pressure": [...] },
//!   "flow": { "flow": [...], "by_weight": [...] },
//!   "temperature": { "basket": [...] },
//!   "profile": { "title": "Blooming", "notes": "..." },
//!   "meta": { "in": 18, "out": 36, "time": 28.4, "grinder": { "setting": "2.5" } },
//!   "timestamp": 1717000000
//! }
//! ```

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{ShotError, ShotResult};

/// Format accepted for the `date` field
pub const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Uploaded shot document
#[derive(Debug, Clone, Deserialize)]
pub struct ShotDocument {
    pub elapsed: Vec<Value>,
    pub pressure: PressureSeries,
    pub flow: FlowSeries,
    pub temperature: TemperatureSeries,
    pub profile: ProfileInfo,
    pub meta: MetaInfo,
    #[serde(default)]
    pub timestamp: Option<MetaValue>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PressureSeries {
    pub pressure: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowSeries {
    pub flow: Vec<Value>,
    pub by_weight: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemperatureSeries {
    pub basket: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaInfo {
    #[serde(default, rename = "in")]
    pub dose_in: Option<MetaValue>,
    #[serde(default, rename = "out")]
    pub yield_out: Option<MetaValue>,
    #[serde(default)]
    pub time: Option<MetaValue>,
    #[serde(default)]
    pub grinder: Option<GrinderInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrinderInfo {
    #[serde(default)]
    pub setting: Option<MetaValue>,
}

impl ShotDocument {
    /// Parse a document from raw upload bytes
    pub fn from_slice(bytes: &[u8]) -> ShotResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Numeric traces, truncated to the shortest series
    pub fn trace(&self) -> ShotResult<ShotTrace> {
        ShotTrace::from_document(self)
    }

    /// Metadata shown in the receipt columns
    pub fn metadata(&self) -> ShotMetadata {
        let title = self
            .profile
            .title
            .as_ref()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let notes = self
            .profile
            .notes
            .as_ref()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        ShotMetadata {
            profile_title: title,
            bean_notes: notes,
            dose_in: self.meta.dose_in.clone(),
            yield_out: self.meta.yield_out.clone(),
            shot_time: self.meta.time.clone(),
            grinder_setting: self.meta.grinder.as_ref().and_then(|g| g.setting.clone()),
            recorded_at: ShotTimestamp::resolve(self.timestamp.as_ref(), self.date.as_deref()),
        }
    }
}

/// Scalar metadata value: the plugin sends numbers or strings interchangeably
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
    Other(Value),
}

impl MetaValue {
    /// Numeric reading, accepting numeric strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Text(s) => s.trim().parse().ok(),
            MetaValue::Other(_) => None,
        }
    }

    /// Whether the value counts as "set" (non-zero, non-empty)
    pub fn is_present(&self) -> bool {
        match self {
            MetaValue::Number(n) => *n != 0.0,
            MetaValue::Text(s) => !s.trim().is_empty(),
            MetaValue::Other(v) => !v.is_null(),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{:.1}", n),
            MetaValue::Number(n) => write!(f, "{}", n),
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Parallel numeric series of one shot
///
/// All series have identical length: longer series are cut to the shortest
/// one, trailing samples are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotTrace {
    /// Elapsed time (s)
    pub elapsed: Vec<f64>,
    /// Group pressure (bar)
    pub pressure: Vec<f64>,
    /// Water flow (g/s)
    pub flow: Vec<f64>,
    /// Weight-based flow (g/s)
    pub flow_by_weight: Vec<f64>,
    /// Basket temperature (°C)
    pub basket_temp: Vec<f64>,
}

impl ShotTrace {
    pub fn from_document(doc: &ShotDocument) -> ShotResult<Self> {
        let elapsed = numeric_series("elapsed", &doc.elapsed)?;
        let pressure = numeric_series("pressure.pressure", &doc.pressure.pressure)?;
        let flow = numeric_series("flow.flow", &doc.flow.flow)?;
        let flow_by_weight = numeric_series("flow.by_weight", &doc.flow.by_weight)?;
        let basket_temp = numeric_series("temperature.basket", &doc.temperature.basket)?;

        Ok(Self::truncated(
            elapsed,
            pressure,
            flow,
            flow_by_weight,
            basket_temp,
        ))
    }

    /// Build a trace from raw series, cutting every series to the shortest
    pub fn truncated(
        mut elapsed: Vec<f64>,
        mut pressure: Vec<f64>,
        mut flow: Vec<f64>,
        mut flow_by_weight: Vec<f64>,
        mut basket_temp: Vec<f64>,
    ) -> Self {
        let min_length = [
            elapsed.len(),
            pressure.len(),
            flow.len(),
            flow_by_weight.len(),
            basket_temp.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);

        elapsed.truncate(min_length);
        pressure.truncate(min_length);
        flow.truncate(min_length);
        flow_by_weight.truncate(min_length);
        basket_temp.truncate(min_length);

        Self {
            elapsed,
            pressure,
            flow,
            flow_by_weight,
            basket_temp,
        }
    }

    pub fn len(&self) -> usize {
        self.elapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed.is_empty()
    }

    /// Basket temperature at the first sample
    pub fn initial_temperature(&self) -> ShotResult<f64> {
        self.basket_temp.first().copied().ok_or(ShotError::EmptyTrace)
    }

    /// Elapsed time range covered by the trace
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let min = self.elapsed.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.elapsed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (min.is_finite() && max.is_finite()).then_some((min, max))
    }
}

fn numeric_series(series: &'static str, values: &[Value]) -> ShotResult<Vec<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, v)| {
            let n = match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            n.filter(|n| n.is_finite())
                .ok_or(ShotError::NonNumeric { series, index })
        })
        .collect()
}

/// When the shot was pulled
///
/// `timestamp` (epoch seconds) is authoritative when set; the formatted
/// `date` string is only consulted when it is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum ShotTimestamp {
    Epoch(MetaValue),
    Formatted(String),
    Unknown,
}

impl ShotTimestamp {
    pub fn resolve(timestamp: Option<&MetaValue>, date: Option<&str>) -> Self {
        if let Some(ts) = timestamp.filter(|ts| ts.is_present()) {
            return Self::Epoch(ts.clone());
        }
        match date.map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Self::Formatted(d.to_string()),
            None => Self::Unknown,
        }
    }

    /// Local wall-clock time, `None` when missing or unparseable
    pub fn local_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Epoch(value) => {
                let secs = value.as_f64()?;
                let whole = secs.trunc() as i64;
                let nanos = (secs.fract().abs() * 1e9) as u32;
                Local
                    .timestamp_opt(whole, nanos)
                    .single()
                    .map(|dt| dt.naive_local())
            }
            Self::Formatted(s) => NaiveDateTime::parse_from_str(s, DATE_FORMAT).ok(),
            Self::Unknown => None,
        }
    }
}

/// Metadata printed beside the chart
#[derive(Debug, Clone, PartialEq)]
pub struct ShotMetadata {
    /// Profile title, `None` when missing or blank
    pub profile_title: Option<String>,
    /// Free-form bean notes (may contain CJK punctuation)
    pub bean_notes: Option<String>,
    /// Dose (g)
    pub dose_in: Option<MetaValue>,
    /// Yield (g)
    pub yield_out: Option<MetaValue>,
    /// Shot duration (s)
    pub shot_time: Option<MetaValue>,
    pub grinder_setting: Option<MetaValue>,
    pub recorded_at: ShotTimestamp,
}

/// Loose summary extracted at ingestion for the ledger
///
/// Works on any JSON value, so a document that later fails to render still
/// gets a meaningful ledger entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotSummary {
    pub clock: Option<String>,
    pub profile: Option<String>,
}

impl ShotSummary {
    pub fn from_value(value: &Value) -> Self {
        let clock = value.get("clock").and_then(|c| match c {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        let profile = match value.get("profile") {
            Some(Value::Object(p)) => p.get("title").and_then(Value::as_str).map(str::to_string),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        Self { clock, profile }
    }
}
