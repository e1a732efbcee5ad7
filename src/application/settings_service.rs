// Settings service - In-memory snapshot with serialized, persisted updates
use crate::application::scheduler::Scheduler;
use crate::application::settings_repository::SettingsRepository;
use crate::domain::error::{SchedulerError, SettingsError, SettingsUpdateError};
use crate::domain::settings::{Settings, SettingsPatch};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct SettingsService {
    repository: Arc<dyn SettingsRepository>,
    current: RwLock<Arc<Settings>>,
    update_lock: Mutex<()>,
    scheduler: Option<Arc<Scheduler>>,
}

impl SettingsService {
    /// Load the persisted settings once and hold them as the current snapshot.
    pub async fn load(repository: Arc<dyn SettingsRepository>) -> Result<Self, SettingsError> {
        let settings = repository.load().await?;
        Ok(Self {
            repository,
            current: RwLock::new(Arc::new(settings)),
            update_lock: Mutex::new(()),
            scheduler: None,
        })
    }

    /// Propagate interval changes to a running scheduler.
    pub fn with_scheduler(mut self, scheduler: Arc<Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub async fn get(&self) -> Arc<Settings> {
        self.current.read().await.clone()
    }

    /// Validate and merge a partial document, persist it, then publish the new snapshot.
    pub async fn update(&self, document: &Value) -> Result<Arc<Settings>, SettingsUpdateError> {
        let patch = SettingsPatch::from_json(document)?;

        let _guard = self.update_lock.lock().await;
        let previous = self.get().await;
        let next = Arc::new(previous.apply(patch));

        self.repository.save(&next).await?;
        *self.current.write().await = next.clone();

        if next.test_interval_minutes != previous.test_interval_minutes {
            self.reschedule(next.test_interval_minutes).await;
        }

        tracing::info!("Settings updated");
        Ok(next)
    }

    async fn reschedule(&self, interval_minutes: u32) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        match scheduler.reschedule(interval_minutes).await {
            Ok(()) => {}
            Err(SchedulerError::NotRunning) => {
                tracing::warn!("Scheduler not running; new interval applies on next start");
            }
            Err(e) => tracing::error!("Failed to reschedule measurements: {}", e),
        }
    }
}
