// In-memory fakes for application layer tests
use crate::application::measurement_source::MeasurementSource;
use crate::application::sample_repository::SampleRepository;
use crate::application::settings_repository::SettingsRepository;
use crate::domain::error::{MeasurementError, SettingsError, StoreError};
use crate::domain::sample::{encode_timestamp, Measurement, Sample};
use crate::domain::settings::Settings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FixedSource {
    result: Option<Measurement>,
}

impl FixedSource {
    pub fn succeeding(download_mbps: f64, upload_mbps: f64, latency_ms: f64) -> Self {
        Self { result: Some(Measurement { download_mbps, upload_mbps, latency_ms }) }
    }

    pub fn failing() -> Self {
        Self { result: None }
    }
}

#[async_trait]
impl MeasurementSource for FixedSource {
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        self.result.ok_or_else(|| MeasurementError::Transport("connection refused".to_string()))
    }
}

#[derive(Default)]
pub struct MemorySampleRepository {
    samples: Mutex<Vec<Sample>>,
    appends: AtomicUsize,
    broken: bool,
}

impl MemorySampleRepository {
    pub fn broken() -> Self {
        Self { broken: true, ..Self::default() }
    }

    pub fn with_samples(samples: Vec<Sample>) -> Self {
        Self { samples: Mutex::new(samples), ..Self::default() }
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().unwrap().clone()
    }

    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleRepository for MemorySampleRepository {
    async fn append(&self, sample: &Sample) -> Result<(), StoreError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(StoreError::Storage("disk I/O error".to_string()));
        }
        let mut samples = self.samples.lock().unwrap();
        if samples.iter().any(|s| s.timestamp == sample.timestamp) {
            return Err(StoreError::DuplicateKey { timestamp: encode_timestamp(&sample.timestamp) });
        }
        samples.push(sample.clone());
        Ok(())
    }

    async fn query(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Sample>, StoreError> {
        if self.broken {
            return Err(StoreError::Storage("disk I/O error".to_string()));
        }
        let mut samples: Vec<Sample> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| since.is_none_or(|since| s.timestamp >= since))
            .cloned()
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    saved: Mutex<Option<Settings>>,
    saves: AtomicUsize,
    broken: bool,
}

impl MemorySettingsRepository {
    pub fn broken() -> Self {
        Self { broken: true, ..Self::default() }
    }

    pub fn saved(&self) -> Option<Settings> {
        self.saved.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        Ok(self.saved().unwrap_or_default())
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(SettingsError::Storage("database is locked".to_string()));
        }
        *self.saved.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}
