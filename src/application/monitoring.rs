use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{NetworkInterface, SpeedUnit, ThroughputSample};
use crate::error::SamplerError;
use crate::ports::CounterSource;

use super::sampler::SpeedSampler;
use super::session::{SessionStore, StorageStatus};

/// Snapshot of the monitor for status displays
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub interface: String,
    /// `None` when the interface has disappeared
    pub is_up: Option<bool>,
    pub running: bool,
    pub samples: usize,
    pub capacity: usize,
    pub session_start: NaiveDateTime,
    pub storage: StorageStatus,
}

/// Main application service: drives the sampler and feeds the session store
pub struct MonitoringService {
    source: Arc<dyn CounterSource>,
    sampler: Mutex<SpeedSampler>,
    store: Arc<SessionStore>,
    running: AtomicBool,
    interface: String,
}

impl MonitoringService {
    pub fn new(source: Arc<dyn CounterSource>, sampler: SpeedSampler, store: Arc<SessionStore>) -> Self {
        let interface = sampler.interface().to_string();
        Self {
            source,
            sampler: Mutex::new(sampler),
            store,
            running: AtomicBool::new(false),
            interface,
        }
    }

    fn sampler(&self) -> MutexGuard<'_, SpeedSampler> {
        self.sampler.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resume sampling. Returns `false` if it was already running.
    pub fn start(&self) -> Result<bool, SamplerError> {
        if self.is_running() {
            return Ok(false);
        }

        self.sampler().reset_baseline()?;
        let started = !self.running.swap(true, Ordering::SeqCst);
        if started {
            info!("Monitoring {}...", self.interface);
        }
        Ok(started)
    }

    /// Pause sampling. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let stopped = self.running.swap(false, Ordering::SeqCst);
        if stopped {
            info!("Monitoring stopped");
        }
        stopped
    }

    /// Take one sample and record it in the session
    pub fn tick(&self) -> Result<ThroughputSample, SamplerError> {
        let sample = self.sampler().sample()?;
        self.store.record(sample);
        Ok(sample)
    }

    pub fn latest(&self) -> Option<ThroughputSample> {
        self.store.latest()
    }

    pub fn status(&self) -> MonitorStatus {
        let is_up = match self.sampler().is_up() {
            Ok(is_up) => Some(is_up),
            Err(e) => {
                debug!("Interface state unavailable: {}", e);
                None
            }
        };

        MonitorStatus {
            interface: self.interface.clone(),
            is_up,
            running: self.is_running(),
            samples: self.store.len(),
            capacity: self.store.capacity(),
            session_start: self.store.session_start(),
            storage: self.store.storage_status().clone(),
        }
    }

    /// List all network interfaces with their counters
    pub fn list_interfaces(&self) -> Result<Vec<NetworkInterface>, Box<dyn std::error::Error + Send + Sync>> {
        self.source.list_interfaces()
    }

    /// Sampling loop: ticks every `period` while running, until `shutdown` flips to true.
    ///
    /// Per-tick failures are logged and retried on the next tick.
    pub async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_running() {
                        continue;
                    }
                    match self.tick() {
                        Ok(sample) => debug!(
                            "Upload: {} | Download: {}",
                            SpeedUnit::MegabytesPerSecond.format(sample.upload_mb_per_s),
                            SpeedUnit::MegabytesPerSecond.format(sample.download_mb_per_s)
                        ),
                        Err(e) => warn!("Sampling failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.stop();
        info!("Sampling loop exited");
    }
}
