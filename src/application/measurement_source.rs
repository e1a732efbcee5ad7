// Measurement source trait - one network quality probe per call
use crate::domain::error::MeasurementError;
use crate::domain::sample::Measurement;
use async_trait::async_trait;

#[async_trait]
pub trait MeasurementSource: Send + Sync {
    async fn measure(&self) -> Result<Measurement, MeasurementError>;
}
