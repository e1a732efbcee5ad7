// Repository trait for the measurement time series
use crate::domain::error::StoreError;
use crate::domain::sample::Sample;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SampleRepository: Send + Sync {
    /// Insert a new sample. Fails with `DuplicateKey` instead of overwriting.
    async fn append(&self, sample: &Sample) -> Result<(), StoreError>;

    /// All samples at or after `since` (or every sample), oldest first.
    async fn query(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Sample>, StoreError>;
}
