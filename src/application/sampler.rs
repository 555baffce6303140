use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info_span, warn, Span};

use crate::adapters::RollingHistory;
use crate::domain::{bytes_to_megabytes, CounterSnapshot, InterfaceCounters, ThroughputSample};
use crate::error::SamplerError;
use crate::ports::{CounterSource, MetricStore};

/// Shortest interval a speed is computed over
pub const MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Check that `name` exists and report whether it is up.
///
/// Absence is an error; a down interface is not.
pub fn validate_interface(source: &dyn CounterSource, name: &str) -> Result<bool, SamplerError> {
    match source.interface_state(name) {
        Ok(Some(is_up)) => Ok(is_up),
        Ok(None) => Err(SamplerError::InterfaceNotFound(name.to_string())),
        Err(source) => Err(SamplerError::Sample {
            interface: name.to_string(),
            source,
        }),
    }
}

/// Turns successive counter snapshots of one interface into throughput samples
pub struct SpeedSampler {
    source: Arc<dyn CounterSource>,
    interface: String,
    last: CounterSnapshot,
    history: RollingHistory,
    span: Span,
}

impl SpeedSampler {
    pub fn new(
        source: Arc<dyn CounterSource>,
        interface: impl Into<String>,
        history_capacity: usize,
    ) -> Result<Self, SamplerError> {
        let interface = interface.into();
        let span = info_span!("sampler", interface = %interface);

        let baseline = {
            let _enter = span.enter();

            if !validate_interface(source.as_ref(), &interface)? {
                warn!("Interface {} is down", interface);
            }

            let counters = match read_counters(source.as_ref(), &interface) {
                Err(SamplerError::InterfaceGone(name)) => return Err(SamplerError::InterfaceNotFound(name)),
                other => other?,
            };
            debug!(
                "Baseline: {} bytes sent, {} bytes received",
                counters.bytes_sent, counters.bytes_received
            );
            CounterSnapshot::new(counters, Instant::now())
        };

        Ok(Self {
            source,
            interface,
            last: baseline,
            history: RollingHistory::new(history_capacity),
            span,
        })
    }

    /// Log under `span` instead of the default `sampler` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Whether the sampled interface is currently up
    pub fn is_up(&self) -> Result<bool, SamplerError> {
        match validate_interface(self.source.as_ref(), &self.interface) {
            Err(SamplerError::InterfaceNotFound(name)) => Err(SamplerError::InterfaceGone(name)),
            other => other,
        }
    }

    /// Take a new snapshot and compute throughput since the previous one
    pub fn sample(&mut self) -> Result<ThroughputSample, SamplerError> {
        self.sample_at(Instant::now(), Local::now().naive_local())
    }

    fn sample_at(&mut self, now: Instant, timestamp: NaiveDateTime) -> Result<ThroughputSample, SamplerError> {
        let _enter = self.span.enter();

        let current = CounterSnapshot::new(read_counters(self.source.as_ref(), &self.interface)?, now);

        let elapsed = now.saturating_duration_since(self.last.observed_at).max(MIN_ELAPSED);
        let delta = current.delta_since(&self.last);
        if delta.discontinuity {
            warn!(
                "Counter discontinuity on {} (sent {} -> {}, received {} -> {}), treating as zero traffic",
                self.interface,
                self.last.counters.bytes_sent,
                current.counters.bytes_sent,
                self.last.counters.bytes_received,
                current.counters.bytes_received
            );
        }

        let seconds = elapsed.as_secs_f64();
        let sample = ThroughputSample::new(
            timestamp,
            bytes_to_megabytes(delta.sent) / seconds,
            bytes_to_megabytes(delta.received) / seconds,
        );

        self.last = current;
        self.history.store(sample);

        Ok(sample)
    }

    /// Replace the baseline with fresh counters without producing a sample,
    /// so the next speed is not averaged over an idle period.
    pub fn reset_baseline(&mut self) -> Result<(), SamplerError> {
        self.reset_baseline_at(Instant::now())
    }

    fn reset_baseline_at(&mut self, now: Instant) -> Result<(), SamplerError> {
        let _enter = self.span.enter();
        let counters = read_counters(self.source.as_ref(), &self.interface)?;
        self.last = CounterSnapshot::new(counters, now);
        debug!("Baseline reset");
        Ok(())
    }

    /// Samples taken so far, oldest first
    pub fn history(&self) -> Vec<ThroughputSample> {
        self.history.snapshot()
    }
}

fn read_counters(source: &dyn CounterSource, interface: &str) -> Result<InterfaceCounters, SamplerError> {
    match source.read_counters(interface) {
        Ok(Some(counters)) => Ok(counters),
        Ok(None) => Err(SamplerError::InterfaceGone(interface.to_string())),
        Err(source) => Err(SamplerError::Sample {
            interface: interface.to_string(),
            source,
        }),
    }
}
