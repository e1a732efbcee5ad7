// Query service - Use case for reading a time-framed series with medians
use crate::application::sample_repository::SampleRepository;
use crate::domain::sample::{Medians, Sample};
use crate::domain::settings::{Settings, ALL_TIME_FRAME};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesView {
    pub series: Vec<Sample>,
    pub medians: Medians,
}

#[derive(Clone)]
pub struct MetricsQueryService {
    repository: Arc<dyn SampleRepository>,
}

impl MetricsQueryService {
    pub fn new(repository: Arc<dyn SampleRepository>) -> Self {
        Self { repository }
    }

    /// Never fails: storage errors degrade to an empty view.
    pub async fn get_series(&self, time_frame: &str, settings: &Settings) -> SeriesView {
        self.get_series_at(time_frame, settings, Utc::now()).await
    }

    pub async fn get_series_at(&self, time_frame: &str, settings: &Settings, now: DateTime<Utc>) -> SeriesView {
        let since = lower_bound(time_frame, settings, now);
        tracing::debug!("Querying samples for time frame {} since {:?}", time_frame, since);

        match self.repository.query(since).await {
            Ok(series) => {
                let medians = Medians::from_samples(&series);
                SeriesView { series, medians }
            }
            Err(e) => {
                tracing::error!("Error fetching samples for time frame {}: {}", time_frame, e);
                SeriesView::default()
            }
        }
    }
}

/// `all`, unknown keys and empty deltas have no lower bound.
fn lower_bound(time_frame: &str, settings: &Settings, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if time_frame == ALL_TIME_FRAME {
        return None;
    }
    let delta = settings.time_frames.get(time_frame)?.delta.to_duration()?;
    now.checked_sub_signed(delta)
}
