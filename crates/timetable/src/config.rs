/// Client configuration: backend location, timeouts and timetable defaults
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::schedule::period::{default_periods, Period, PeriodModel};

/// Backend base URL used when none is configured.
const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST backend, including the `/api` prefix
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Generous by default; the hosted backend has slow cold starts
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Sent as `Authorization: Bearer` on every non-public endpoint
    pub bearer_token: Option<String>,
    /// Quiet time before an edited cell is written
    pub autosave_debounce_ms: u64,
    pub subject_cache_ttl_secs: u64,
    pub default_department: String,
    pub default_section: String,
    pub periods: Vec<Period>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 90,
            user_agent: concat!("campus-timetable/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
            autosave_debounce_ms: 400,
            subject_cache_ttl_secs: 300,
            default_department: "Computer Science".to_string(),
            default_section: "A".to_string(),
            periods: default_periods(),
        }
    }
}

impl ClientConfig {
    /// Loads a JSON config file. Keys that are absent keep their defaults.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: ClientConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;
        if self.periods.is_empty() {
            bail!("at least one period must be configured");
        }
        let mut ids: Vec<&str> = self.periods.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.periods.len() {
            bail!("period ids must be unique");
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn subject_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.subject_cache_ttl_secs)
    }

    pub fn period_model(&self) -> PeriodModel {
        PeriodModel::new(self.periods.clone())
    }
}
