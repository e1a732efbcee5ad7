// SQLite-backed settings repository (key/value rows)
use crate::application::settings_repository::SettingsRepository;
use crate::domain::error::SettingsError;
use crate::domain::settings::Settings;
use crate::infrastructure::database::Database;
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SqliteSettingsRepository {
    database: Database,
}

impl SqliteSettingsRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    async fn read_rows(&self) -> Result<HashMap<String, String>, SettingsError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(self.database.pool())
            .await
            .map_err(|e| SettingsError::Storage(e.to_string()))?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn load(&self) -> Result<Settings, SettingsError> {
        let rows = self.read_rows().await?;
        let decoded = Settings::from_rows(&rows)?;

        if decoded.needs_persist() {
            tracing::info!("Filling in settings {:?} from defaults", decoded.healed);
            self.save(&decoded.settings).await?;
        }

        Ok(decoded.settings)
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let rows = settings.to_rows()?;
        let storage = |e: sqlx::Error| SettingsError::Storage(e.to_string());

        let mut tx = self.database.pool().begin().await.map_err(storage)?;
        for (key, value) in rows {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value) VALUES (?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key.name())
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }
        tx.commit().await.map_err(storage)?;

        tracing::debug!("Saved settings");
        Ok(())
    }
}
