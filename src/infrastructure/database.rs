// SQLite database handle and schema migrations
use crate::domain::sample::{decode_timestamp, encode_timestamp};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::path::Path;
use std::time::Duration;

const SCHEMA_VERSION: i64 = 2;

/// One database file holding both the sample series and the settings table.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Opening database at {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await
            .context("Failed to create schema_version table")?;

        let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read schema version")?;
        let current = current.unwrap_or(0);

        if current >= SCHEMA_VERSION {
            tracing::debug!("Database schema is up to date (version {})", current);
            return Ok(());
        }

        tracing::info!("Migrating database from version {} to {}", current, SCHEMA_VERSION);
        let mut tx = self.pool.begin().await.context("Failed to begin migration")?;
        if current < 1 {
            migrate_to_v1(&mut tx).await?;
        }
        if current < 2 {
            migrate_to_v2(&mut tx).await?;
        }
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(SCHEMA_VERSION)
            .execute(&mut *tx)
            .await
            .context("Failed to record schema version")?;
        tx.commit().await.context("Failed to commit migration")?;

        Ok(())
    }
}

async fn migrate_to_v1(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS network_tests (
            timestamp TEXT PRIMARY KEY,
            download_mbps REAL,
            upload_mbps REAL,
            latency_ms REAL
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .context("Failed to create network_tests table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .context("Failed to create settings table")?;

    Ok(())
}

/// Rewrites naive timestamps left by older versions into UTC text so range queries compare correctly.
async fn migrate_to_v2(conn: &mut SqliteConnection) -> Result<()> {
    let legacy: Vec<String> = sqlx::query_scalar("SELECT timestamp FROM network_tests WHERE timestamp NOT LIKE '%Z'")
        .fetch_all(&mut *conn)
        .await
        .context("Failed to read legacy timestamps")?;

    let mut converted = 0;
    for text in &legacy {
        let timestamp = match decode_timestamp(text) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!("Leaving unreadable timestamp {:?} as is: {}", text, e);
                continue;
            }
        };

        let result = sqlx::query("UPDATE OR IGNORE network_tests SET timestamp = ? WHERE timestamp = ?")
            .bind(encode_timestamp(&timestamp))
            .bind(text)
            .execute(&mut *conn)
            .await
            .context("Failed to convert legacy timestamp")?;
        if result.rows_affected() == 0 {
            tracing::warn!("Timestamp {:?} collides with an existing sample, left as is", text);
        } else {
            converted += 1;
        }
    }

    if !legacy.is_empty() {
        tracing::info!("Converted {} of {} legacy timestamps to UTC", converted, legacy.len());
    }
    Ok(())
}
