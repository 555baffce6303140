use crate::domain::ThroughputSample;

/// Port for a bounded, chronologically ordered sample buffer
pub trait MetricStore: Send + Sync {
    /// Append a sample, evicting the oldest one when full
    fn store(&mut self, sample: ThroughputSample);

    /// Most recent sample
    fn latest(&self) -> Option<ThroughputSample>;

    /// Copy of all samples, oldest first
    fn snapshot(&self) -> Vec<ThroughputSample>;

    /// Drop every sample
    fn clear(&mut self);

    /// Replace the contents wholesale; only the newest `capacity()` samples are kept
    fn replace(&mut self, samples: Vec<ThroughputSample>) {
        self.clear();
        for sample in samples {
            self.store(sample);
        }
    }

    fn capacity(&self) -> usize;

    /// Get the number of stored samples
    fn len(&self) -> usize;

    /// Check if the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
