// Application settings domain model, persistence schema and update rules
use crate::domain::error::{SettingsError, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Reserved time frame key meaning "no lower bound".
pub const ALL_TIME_FRAME: &str = "all";

/// Lookback window expressed as duration components. Empty means unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
}

impl FrameDelta {
    pub fn hours(hours: u32) -> Self {
        Self { hours: Some(hours), ..Self::default() }
    }

    pub fn days(days: u32) -> Self {
        Self { days: Some(days), ..Self::default() }
    }

    pub fn weeks(weeks: u32) -> Self {
        Self { weeks: Some(weeks), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_none() && self.days.is_none() && self.weeks.is_none()
    }

    pub fn to_duration(&self) -> Option<chrono::Duration> {
        if self.is_empty() {
            return None;
        }
        let hours = i64::from(self.hours.unwrap_or(0));
        let days = i64::from(self.days.unwrap_or(0));
        let weeks = i64::from(self.weeks.unwrap_or(0));
        Some(chrono::Duration::hours(hours) + chrono::Duration::days(days) + chrono::Duration::weeks(weeks))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub label: String,
    #[serde(default)]
    pub delta: FrameDelta,
}

impl TimeFrame {
    pub fn new(label: &str, delta: FrameDelta) -> Self {
        Self { label: label.to_string(), delta }
    }

    fn all_time() -> Self {
        Self::new("All Time", FrameDelta::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub port: u16,
    pub show_median_lines: bool,
    pub open_on_startup: bool,
    pub test_interval_minutes: u32,
    pub default_time_frame: String,
    pub time_frames: BTreeMap<String, TimeFrame>,
}

impl Default for Settings {
    fn default() -> Self {
        let time_frames = BTreeMap::from([
            ("1hour".to_string(), TimeFrame::new("Last Hour", FrameDelta::hours(1))),
            ("1day".to_string(), TimeFrame::new("Last 24 Hours", FrameDelta::days(1))),
            ("1week".to_string(), TimeFrame::new("Last Week", FrameDelta::weeks(1))),
            ("1month".to_string(), TimeFrame::new("Last 30 Days", FrameDelta::days(30))),
            ("1year".to_string(), TimeFrame::new("Last Year", FrameDelta::days(365))),
            (ALL_TIME_FRAME.to_string(), TimeFrame::all_time()),
        ]);

        Self {
            port: 5000,
            show_median_lines: true,
            open_on_startup: true,
            test_interval_minutes: 5,
            default_time_frame: "1day".to_string(),
            time_frames,
        }
    }
}

impl Settings {
    /// Restore the time frame invariants. Returns true when anything changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;

        match self.time_frames.get_mut(ALL_TIME_FRAME) {
            None => {
                self.time_frames.insert(ALL_TIME_FRAME.to_string(), TimeFrame::all_time());
                changed = true;
            }
            // "all" is always unfiltered.
            Some(frame) if !frame.delta.is_empty() => {
                frame.delta = FrameDelta::default();
                changed = true;
            }
            Some(_) => {}
        }

        if !self.time_frames.contains_key(&self.default_time_frame) {
            self.default_time_frame = self
                .time_frames
                .keys()
                .find(|key| key.as_str() != ALL_TIME_FRAME)
                .cloned()
                .unwrap_or_else(|| ALL_TIME_FRAME.to_string());
            changed = true;
        }

        changed
    }

    /// Merge a validated patch into a copy of these settings.
    pub fn apply(&self, patch: SettingsPatch) -> Settings {
        let mut next = self.clone();
        if let Some(port) = patch.port {
            next.port = port;
        }
        if let Some(show) = patch.show_median_lines {
            next.show_median_lines = show;
        }
        if let Some(open) = patch.open_on_startup {
            next.open_on_startup = open;
        }
        if let Some(minutes) = patch.test_interval_minutes {
            next.test_interval_minutes = minutes;
        }
        if let Some(time_frames) = patch.time_frames {
            next.time_frames = time_frames;
        }
        if let Some(default_time_frame) = patch.default_time_frame {
            next.default_time_frame = default_time_frame;
        }
        next.normalize();
        next
    }

    /// Encode every field as one key/value row.
    pub fn to_rows(&self) -> Result<Vec<(SettingKey, String)>, SettingsError> {
        let time_frames = serde_json::to_string(&self.time_frames)
            .map_err(|e| SettingsError::Storage(format!("Failed to serialize time_frames: {}", e)))?;

        Ok(SettingKey::ALL
            .iter()
            .map(|&key| {
                let value = match key {
                    SettingKey::Port => self.port.to_string(),
                    SettingKey::ShowMedianLines => self.show_median_lines.to_string(),
                    SettingKey::OpenOnStartup => self.open_on_startup.to_string(),
                    SettingKey::TestIntervalMinutes => self.test_interval_minutes.to_string(),
                    SettingKey::DefaultTimeFrame => self.default_time_frame.clone(),
                    SettingKey::TimeFrames => time_frames.clone(),
                };
                (key, value)
            })
            .collect())
    }

    /// Rebuild settings from stored rows, filling gaps from the defaults.
    pub fn from_rows(rows: &HashMap<String, String>) -> Result<DecodedSettings, SettingsError> {
        let defaults = Settings::default();
        let mut reader = RowReader { rows, healed: Vec::new() };

        let mut settings = Settings {
            port: reader.integer(SettingKey::Port, defaults.port)?,
            show_median_lines: reader.boolean(SettingKey::ShowMedianLines, defaults.show_median_lines),
            open_on_startup: reader.boolean(SettingKey::OpenOnStartup, defaults.open_on_startup),
            test_interval_minutes: reader
                .integer(SettingKey::TestIntervalMinutes, defaults.test_interval_minutes)?,
            default_time_frame: reader.text(SettingKey::DefaultTimeFrame, defaults.default_time_frame),
            time_frames: reader.json(SettingKey::TimeFrames, defaults.time_frames),
        };

        let mut healed = reader.healed;
        if settings.normalize() {
            healed.push(SettingKey::TimeFrames.name());
        }

        Ok(DecodedSettings { settings, healed })
    }
}

/// Decoded settings plus the keys that had to be filled in or repaired.
#[derive(Debug, Clone)]
pub struct DecodedSettings {
    pub settings: Settings,
    pub healed: Vec<&'static str>,
}

impl DecodedSettings {
    pub fn needs_persist(&self) -> bool {
        !self.healed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Json,
    Text,
}

/// Persisted settings keys and how each one is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Port,
    ShowMedianLines,
    OpenOnStartup,
    TestIntervalMinutes,
    DefaultTimeFrame,
    TimeFrames,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Port,
        SettingKey::ShowMedianLines,
        SettingKey::OpenOnStartup,
        SettingKey::TestIntervalMinutes,
        SettingKey::DefaultTimeFrame,
        SettingKey::TimeFrames,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Port => "port",
            Self::ShowMedianLines => "show_median_lines",
            Self::OpenOnStartup => "open_on_startup",
            Self::TestIntervalMinutes => "test_interval_minutes",
            Self::DefaultTimeFrame => "default_time_frame",
            Self::TimeFrames => "time_frames",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Port | Self::TestIntervalMinutes => FieldKind::Integer,
            Self::ShowMedianLines | Self::OpenOnStartup => FieldKind::Boolean,
            Self::DefaultTimeFrame => FieldKind::Text,
            Self::TimeFrames => FieldKind::Json,
        }
    }
}

struct RowReader<'a> {
    rows: &'a HashMap<String, String>,
    healed: Vec<&'static str>,
}

impl<'a> RowReader<'a> {
    fn raw(&mut self, key: SettingKey) -> Option<&'a str> {
        let value = self.rows.get(key.name()).map(String::as_str);
        if value.is_none() {
            self.healed.push(key.name());
        }
        value
    }

    fn boolean(&mut self, key: SettingKey, default: bool) -> bool {
        debug_assert_eq!(key.kind(), FieldKind::Boolean);
        self.raw(key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(default)
    }

    /// Malformed integers fail the whole load rather than silently defaulting.
    fn integer<T>(&mut self, key: SettingKey, default: T) -> Result<T, SettingsError>
    where
        T: FromStr + Default + PartialEq,
    {
        debug_assert_eq!(key.kind(), FieldKind::Integer);
        let Some(raw) = self.raw(key) else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) if value != T::default() => Ok(value),
            _ => Err(SettingsError::InvalidInteger { key: key.name(), value: raw.to_string() }),
        }
    }

    fn json<T: DeserializeOwned>(&mut self, key: SettingKey, default: T) -> T {
        debug_assert_eq!(key.kind(), FieldKind::Json);
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Stored setting {} is not valid JSON ({}), using default", key.name(), e);
                self.healed.push(key.name());
                default
            }
        }
    }

    fn text(&mut self, key: SettingKey, default: String) -> String {
        debug_assert_eq!(key.kind(), FieldKind::Text);
        self.raw(key).map(str::to_string).unwrap_or(default)
    }
}

/// A validated partial settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub port: Option<u16>,
    pub show_median_lines: Option<bool>,
    pub open_on_startup: Option<bool>,
    pub test_interval_minutes: Option<u32>,
    pub default_time_frame: Option<String>,
    pub time_frames: Option<BTreeMap<String, TimeFrame>>,
}

impl SettingsPatch {
    pub fn from_json(document: &Value) -> Result<Self, ValidationError> {
        let Some(fields) = document.as_object() else {
            return Err(ValidationError::new("Settings payload must be a JSON object"));
        };

        let mut patch = SettingsPatch::default();

        if let Some(value) = fields.get("port") {
            let port = value
                .as_i64()
                .filter(|p| (1..=i64::from(u16::MAX)).contains(p))
                .ok_or_else(|| ValidationError::new("port must be an integer between 1 and 65535"))?;
            patch.port = u16::try_from(port).ok();
        }

        if let Some(value) = fields.get("test_interval_minutes") {
            let minutes = value
                .as_i64()
                .filter(|m| *m > 0)
                .and_then(|m| u32::try_from(m).ok())
                .ok_or_else(|| ValidationError::new("test_interval_minutes must be a positive integer"))?;
            patch.test_interval_minutes = Some(minutes);
        }

        patch.show_median_lines = boolean_field(fields, "show_median_lines")?;
        patch.open_on_startup = boolean_field(fields, "open_on_startup")?;

        if let Some(value) = fields.get("default_time_frame") {
            let key = value
                .as_str()
                .ok_or_else(|| ValidationError::new("default_time_frame must be a string"))?;
            patch.default_time_frame = Some(key.to_string());
        }

        if let Some(value) = fields.get("time_frames") {
            if !value.is_object() {
                return Err(ValidationError::new("time_frames must be an object"));
            }
            let time_frames: BTreeMap<String, TimeFrame> = serde_json::from_value(value.clone())
                .map_err(|e| ValidationError::new(format!("time_frames is malformed: {}", e)))?;
            patch.time_frames = Some(time_frames);
        }

        Ok(patch)
    }
}

fn boolean_field(fields: &serde_json::Map<String, Value>, name: &str) -> Result<Option<bool>, ValidationError> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(ValidationError::new(format!("{} must be a boolean", name))),
    }
}
