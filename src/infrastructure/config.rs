use crate::domain::time_range::TimeRange;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_STORE_PATH: &str = "data/amper-tracker.toml";
const DEFAULT_CONFIG_FILE: &str = "config/app.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// What the headless session opens on start-up. Unset fields fall back to the
/// stored username and the first product and sensor.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub product_id: Option<String>,
    pub sensor: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: PathBuf,
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional config file, then environment overrides
/// (`API_BASE_URL`, `API_TIMEOUT`, `AMPER_STORE_PATH`).
pub fn load_app_config_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<AppConfig> {
    let timeout_override = parse_timeout(env("API_TIMEOUT").as_deref()).map(|ms| ms as i64);

    let settings = config::Config::builder()
        .set_default("api.base_url", DEFAULT_API_BASE_URL)?
        .set_default("api.timeout_ms", DEFAULT_API_TIMEOUT_MS as i64)?
        .set_default("session.time_range", TimeRange::default().token())?
        .set_default("storage.path", DEFAULT_STORE_PATH)?
        .add_source(config::File::from(file).required(false))
        .set_override_option("api.base_url", env("API_BASE_URL").filter(|v| !v.trim().is_empty()))?
        .set_override_option("api.timeout_ms", timeout_override)?
        .set_override_option("storage.path", env("AMPER_STORE_PATH"))?
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Positive millisecond timeout, or `None` to keep the configured default.
pub fn parse_timeout(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
}
