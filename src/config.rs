use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::DEFAULT_CAPACITY;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub interface: String,
    pub poll_interval: Duration,
    pub history_size: usize,
    pub data_dir: PathBuf,
    /// sysfs root override; the adapter defaults to `/sys`
    pub sys_path: Option<PathBuf>,
    pub autostart: bool,
    pub save_on_exit: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("WIFIMON_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            interface: lookup("WIFIMON_INTERFACE").unwrap_or_else(|| "wlo1".to_string()),
            poll_interval: lookup("WIFIMON_POLL_INTERVAL_MS")
                .and_then(|s| s.parse().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(1)),
            history_size: lookup("WIFIMON_HISTORY_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            data_dir: lookup("WIFIMON_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            sys_path: lookup("WIFIMON_SYS_PATH").map(PathBuf::from),
            autostart: lookup("WIFIMON_AUTOSTART")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            save_on_exit: lookup("WIFIMON_SAVE_ON_EXIT")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            log_level: lookup("WIFIMON_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
