// Measurement sample domain models
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

/// Result of one successful network probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: f64,
}

/// One persisted observation, keyed by its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub latency_ms: Option<f64>,
}

impl Sample {
    pub fn from_measurement(timestamp: DateTime<Utc>, measurement: &Measurement) -> Self {
        Self {
            timestamp,
            download_mbps: Some(measurement.download_mbps),
            upload_mbps: Some(measurement.upload_mbps),
            latency_ms: Some(measurement.latency_ms),
        }
    }
}

/// Encode a timestamp as fixed-width text so that lexical order matches time order.
pub fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 text and naive ISO text (read as local time), which older databases hold.
pub fn decode_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")?;
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc()))
}

/// Per-metric medians over a filtered series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Medians {
    pub download: Option<f64>,
    pub upload: Option<f64>,
    pub latency: Option<f64>,
}

impl Medians {
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            download: median(samples.iter().filter_map(|s| s.download_mbps)),
            upload: median(samples.iter().filter_map(|s| s.upload_mbps)),
            latency: median(samples.iter().filter_map(|s| s.latency_ms)),
        }
    }
}

/// Median of the given values; even counts average the two middle values.
pub fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
