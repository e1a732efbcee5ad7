// SQLite-backed sample repository
use crate::application::sample_repository::SampleRepository;
use crate::domain::error::StoreError;
use crate::domain::sample::{decode_timestamp, encode_timestamp, Sample};
use crate::infrastructure::database::Database;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct SqliteSampleRepository {
    database: Database,
}

impl SqliteSampleRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

fn row_to_sample(row: &SqliteRow) -> Result<Sample, StoreError> {
    let timestamp: String = row.try_get("timestamp").map_err(storage_error)?;
    let timestamp = decode_timestamp(&timestamp)
        .map_err(|e| StoreError::CorruptRow(format!("timestamp {:?}: {}", timestamp, e)))?;

    Ok(Sample {
        timestamp,
        download_mbps: row.try_get("download_mbps").map_err(storage_error)?,
        upload_mbps: row.try_get("upload_mbps").map_err(storage_error)?,
        latency_ms: row.try_get("latency_ms").map_err(storage_error)?,
    })
}

fn storage_error(e: sqlx::Error) -> StoreError {
    StoreError::Storage(e.to_string())
}

#[async_trait]
impl SampleRepository for SqliteSampleRepository {
    async fn append(&self, sample: &Sample) -> Result<(), StoreError> {
        let timestamp = encode_timestamp(&sample.timestamp);

        let result = sqlx::query(
            r#"
            INSERT INTO network_tests (timestamp, download_mbps, upload_mbps, latency_ms)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&timestamp)
        .bind(sample.download_mbps)
        .bind(sample.upload_mbps)
        .bind(sample.latency_ms)
        .execute(self.database.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::DuplicateKey { timestamp }),
            Err(e) => Err(storage_error(e)),
        }
    }

    async fn query(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Sample>, StoreError> {
        let rows = match since {
            Some(since) => {
                sqlx::query(
                    r#"
                    SELECT timestamp, download_mbps, upload_mbps, latency_ms
                    FROM network_tests
                    WHERE timestamp >= ?
                    ORDER BY timestamp ASC
                    "#,
                )
                .bind(encode_timestamp(&since))
                .fetch_all(self.database.pool())
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT timestamp, download_mbps, upload_mbps, latency_ms
                    FROM network_tests
                    ORDER BY timestamp ASC
                    "#,
                )
                .fetch_all(self.database.pool())
                .await
            }
        }
        .map_err(storage_error)?;

        tracing::debug!("Fetched {} samples since {:?}", rows.len(), since);

        // One bad row must not hide the rest of the series.
        let mut samples: Vec<Sample> = rows
            .iter()
            .filter_map(|row| match row_to_sample(row) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    tracing::warn!("Skipping unreadable sample row: {}", e);
                    None
                }
            })
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}
