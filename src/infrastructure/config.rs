use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config/internet_tester";
const ENV_PREFIX: &str = "INTERNET_TESTER";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Relative paths are resolved against the executable's directory.
    pub database_path: PathBuf,
    pub bind_host: String,
    pub probe: ProbeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("network_tests.db"),
            bind_host: "0.0.0.0".to_string(),
            probe: ProbeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn database_file(&self) -> PathBuf {
        if self.database_path.is_absolute() {
            return self.database_path.clone();
        }
        install_dir().join(&self.database_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConfig {
    pub base_url: String,
    pub download_bytes: u64,
    pub upload_bytes: u64,
    pub latency_samples: u32,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://speed.cloudflare.com".to_string(),
            download_bytes: 25_000_000,
            upload_bytes: 10_000_000,
            latency_samples: 5,
            timeout_secs: 60,
        }
    }
}

/// Optional config file next to the executable, then `INTERNET_TESTER__*` environment overrides.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_from_dir(&install_dir())
}

fn load_from_dir(dir: &Path) -> anyhow::Result<AppConfig> {
    let file = dir.join(CONFIG_FILE);
    tracing::debug!("Looking for config file {}.*", file.display());
    parse_config(config::File::with_name(&file.to_string_lossy()).required(false))
}

fn parse_config<S>(file: S) -> anyhow::Result<AppConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
