// HTTP speed probe against a speed-test endpoint pair (__down / __up)
use crate::application::measurement_source::MeasurementSource;
use crate::domain::error::MeasurementError;
use crate::domain::sample::Measurement;
use crate::infrastructure::config::ProbeConfig;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HttpSpeedProbe {
    client: Client,
    config: ProbeConfig,
}

impl HttpSpeedProbe {
    pub fn new(config: ProbeConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("internet-tester/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config: ProbeConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    fn down_url(&self, bytes: u64) -> String {
        format!("{}/__down?bytes={}", self.config.base_url, bytes)
    }

    /// Best round trip of several empty downloads.
    async fn latency_ms(&self) -> Result<f64, MeasurementError> {
        let url = self.down_url(0);
        let mut best: Option<Duration> = None;

        for _ in 0..self.config.latency_samples.max(1) {
            let started = Instant::now();
            let response = check_status(self.client.get(&url).send().await.map_err(transport)?)?;
            response.bytes().await.map_err(transport)?;
            let elapsed = started.elapsed();
            best = Some(best.map_or(elapsed, |b| b.min(elapsed)));
        }

        Ok(best.unwrap_or_default().as_secs_f64() * 1000.0)
    }

    async fn download_mbps(&self) -> Result<f64, MeasurementError> {
        let started = Instant::now();
        let mut response = check_status(
            self.client
                .get(self.down_url(self.config.download_bytes))
                .send()
                .await
                .map_err(transport)?,
        )?;

        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            received += chunk.len() as u64;
        }

        throughput_mbps(received, started.elapsed())
    }

    async fn upload_mbps(&self) -> Result<f64, MeasurementError> {
        let size = self.config.upload_bytes;
        let payload = vec![0u8; usize::try_from(size).unwrap_or(usize::MAX)];

        let started = Instant::now();
        let response = check_status(
            self.client
                .post(format!("{}/__up", self.config.base_url))
                .body(payload)
                .send()
                .await
                .map_err(transport)?,
        )?;
        response.bytes().await.map_err(transport)?;

        throughput_mbps(size, started.elapsed())
    }
}

#[async_trait]
impl MeasurementSource for HttpSpeedProbe {
    async fn measure(&self) -> Result<Measurement, MeasurementError> {
        let latency_ms = self.latency_ms().await?;
        let download_mbps = self.download_mbps().await?;
        let upload_mbps = self.upload_mbps().await?;

        tracing::debug!(
            "Probe finished: {:.2} Mbps down, {:.2} Mbps up, {:.2} ms",
            download_mbps,
            upload_mbps,
            latency_ms
        );

        Ok(Measurement { download_mbps, upload_mbps, latency_ms })
    }
}

fn transport(e: reqwest::Error) -> MeasurementError {
    MeasurementError::Transport(e.to_string())
}

fn check_status(response: Response) -> Result<Response, MeasurementError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(MeasurementError::Status(status.as_u16()))
    }
}

/// Bits per second over the elapsed time, in Mbit/s.
fn throughput_mbps(bytes: u64, elapsed: Duration) -> Result<f64, MeasurementError> {
    if bytes == 0 || elapsed.is_zero() {
        return Err(MeasurementError::EmptyTransfer);
    }
    Ok(bytes as f64 * 8.0 / elapsed.as_secs_f64() / 1_000_000.0)
}
