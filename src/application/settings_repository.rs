// Repository trait for persisted settings
use crate::domain::error::SettingsError;
use crate::domain::settings::Settings;
use async_trait::async_trait;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Read settings, filling and persisting any missing keys from the defaults.
    async fn load(&self) -> Result<Settings, SettingsError>;

    /// Upsert every field. Keys are never deleted.
    async fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}
