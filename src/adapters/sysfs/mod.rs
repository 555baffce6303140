mod parser;

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::domain::{InterfaceCounters, NetworkInterface};
use crate::ports::CounterSource;

use parser::ParseError;

/// Configuration for the sysfs root, e.g. a host `/sys` bind-mounted elsewhere
#[derive(Debug, Clone)]
pub struct SysfsConfig {
    pub sys_path: PathBuf,
}

impl SysfsConfig {
    pub fn new(sys_path: impl Into<PathBuf>) -> Self {
        Self {
            sys_path: sys_path.into(),
        }
    }

    pub fn host() -> Self {
        Self::new("/sys")
    }

    fn net_class_path(&self) -> PathBuf {
        self.sys_path.join("class/net")
    }
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self::host()
    }
}

/// Counter source reading `/sys/class/net`
#[derive(Debug, Clone)]
pub struct SysfsCounterSource {
    config: SysfsConfig,
}

impl SysfsCounterSource {
    pub fn new(config: SysfsConfig) -> Self {
        Self { config }
    }

    pub fn with_default_paths() -> Self {
        Self::new(SysfsConfig::default())
    }

    /// Directory of `name`, or `None` if no such interface is listed
    fn interface_dir(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return None;
        }

        let dir = self.config.net_class_path().join(name);
        dir.is_dir().then_some(dir)
    }
}

/// An interface removed while we were reading it reads as absent
fn absent_if_vanished<T>(result: Result<T, ParseError>) -> Result<Option<T>, Box<dyn std::error::Error + Send + Sync>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ParseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CounterSource for SysfsCounterSource {
    fn interface_state(&self, name: &str) -> Result<Option<bool>, Box<dyn std::error::Error + Send + Sync>> {
        match self.interface_dir(name) {
            Some(dir) => absent_if_vanished(parser::parse_is_up(&dir)),
            None => Ok(None),
        }
    }

    fn read_counters(
        &self,
        name: &str,
    ) -> Result<Option<InterfaceCounters>, Box<dyn std::error::Error + Send + Sync>> {
        match self.interface_dir(name) {
            Some(dir) => absent_if_vanished(parser::parse_net_stats(&dir.join("statistics"))),
            None => Ok(None),
        }
    }

    fn list_interfaces(&self) -> Result<Vec<NetworkInterface>, Box<dyn std::error::Error + Send + Sync>> {
        let mut interfaces = Vec::new();

        for entry in fs::read_dir(self.config.net_class_path())? {
            let entry = entry?;
            let interface_name = entry.file_name().to_string_lossy().to_string();
            let dir = entry.path();

            let is_up = parser::parse_is_up(&dir).unwrap_or(false);

            match parser::parse_net_stats(&dir.join("statistics")) {
                Ok(counters) => interfaces.push(NetworkInterface::new(interface_name, is_up, counters)),
                Err(e) => debug!("Skipping interface {}: {}", interface_name, e),
            }
        }

        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }
}
