use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub real_time_updates: RealTimeUpdatesConfig,
    pub chart: ChartConfig,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealTimeUpdatesConfig {
    pub enabled: bool,
    /// Zero forwards every push message as soon as it arrives. Otherwise
    /// messages are batched and reloads happen at most once per interval.
    pub interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// IANA time zone in which visit dates are bucketed
    pub timezone: String,
    pub skip_empty: bool,
}

/// Backend server the visits are loaded from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "ServerConfig::default_page_size")]
    pub page_size: u32,
}

impl Default for RealTimeUpdatesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::ZERO,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            skip_empty: true,
        }
    }
}

impl ChartConfig {
    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid CHART_TIMEZONE '{}': {}", self.timezone, e))
    }
}

impl ServerConfig {
    const fn default_page_size() -> u32 {
        5000
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value).unwrap_or_else(|| {
            tracing::warn!("Unknown {name} value '{value}', falling back to '{default}'");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let real_time_enabled = env_bool("REAL_TIME_UPDATES", true);
        let interval_minutes = std::env::var("REAL_TIME_UPDATES_INTERVAL")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u64>()
            .context("REAL_TIME_UPDATES_INTERVAL must be a number of minutes")?;

        let timezone = std::env::var("CHART_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let skip_empty = env_bool("CHART_SKIP_EMPTY", true);

        let server = match std::env::var("SERVER_URL") {
            Ok(url) => {
                let api_key = std::env::var("SERVER_API_KEY").ok();
                let page_size = std::env::var("VISITS_PAGE_SIZE")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|size| *size > 0)
                    .unwrap_or_else(ServerConfig::default_page_size);

                Some(ServerConfig {
                    url: url.trim_end_matches('/').to_string(),
                    api_key,
                    page_size,
                })
            }
            Err(_) => None,
        };

        let config = Config {
            real_time_updates: RealTimeUpdatesConfig {
                enabled: real_time_enabled,
                interval: Duration::from_secs(interval_minutes * 60),
            },
            chart: ChartConfig {
                timezone,
                skip_empty,
            },
            server,
        };

        // Fail early on an unknown time zone name
        config.chart.timezone()?;

        Ok(config)
    }
}
