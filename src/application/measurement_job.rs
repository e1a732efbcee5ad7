// Scheduled tick: probe the connection and store a successful result
use crate::application::measurement_source::MeasurementSource;
use crate::application::sample_repository::SampleRepository;
use crate::application::scheduler::Job;
use crate::domain::error::StoreError;
use crate::domain::sample::Sample;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MeasurementJob {
    source: Arc<dyn MeasurementSource>,
    repository: Arc<dyn SampleRepository>,
    clock: fn() -> DateTime<Utc>,
}

impl MeasurementJob {
    pub fn new(source: Arc<dyn MeasurementSource>, repository: Arc<dyn SampleRepository>) -> Self {
        Self { source, repository, clock: Utc::now }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Job for MeasurementJob {
    async fn run(&self) {
        tracing::info!("Running scheduled network measurement");

        let measurement = match self.source.measure().await {
            Ok(measurement) => measurement,
            Err(e) => {
                tracing::warn!("Measurement failed, nothing stored: {}", e);
                return;
            }
        };

        let sample = Sample::from_measurement((self.clock)(), &measurement);
        match self.repository.append(&sample).await {
            Ok(()) => tracing::info!(
                download_mbps = measurement.download_mbps,
                upload_mbps = measurement.upload_mbps,
                latency_ms = measurement.latency_ms,
                "Stored measurement taken at {}",
                sample.timestamp
            ),
            Err(e @ StoreError::DuplicateKey { .. }) => {
                tracing::warn!("Discarding measurement: {}", e);
            }
            Err(e) => {
                tracing::error!("Failed to store measurement: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FixedSource, MemorySampleRepository};
    use chrono::TimeZone;

    fn frozen_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_success_appends_one_complete_sample() {
        let repository = Arc::new(MemorySampleRepository::default());
        let job = MeasurementJob::new(Arc::new(FixedSource::succeeding(95.5, 11.25, 14.0)), repository.clone());

        job.run().await;

        let samples = repository.samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].download_mbps, Some(95.5));
        assert_eq!(samples[0].upload_mbps, Some(11.25));
        assert_eq!(samples[0].latency_ms, Some(14.0));
    }

    #[tokio::test]
    async fn test_failure_never_touches_the_store() {
        let repository = Arc::new(MemorySampleRepository::default());
        let job = MeasurementJob::new(Arc::new(FixedSource::failing()), repository.clone());

        job.run().await;
        job.run().await;

        assert!(repository.samples().is_empty());
        assert_eq!(repository.append_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_is_discarded() {
        let repository = Arc::new(MemorySampleRepository::default());
        let job = MeasurementJob::new(Arc::new(FixedSource::succeeding(50.0, 5.0, 20.0)), repository.clone())
            .with_clock(frozen_clock);

        job.run().await;
        job.run().await;

        assert_eq!(repository.append_calls(), 2);
        assert_eq!(repository.samples().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_error_is_swallowed() {
        let repository = Arc::new(MemorySampleRepository::broken());
        let job = MeasurementJob::new(Arc::new(FixedSource::succeeding(50.0, 5.0, 20.0)), repository.clone());

        job.run().await;

        assert_eq!(repository.append_calls(), 1);
        assert!(repository.samples().is_empty());
    }
}
