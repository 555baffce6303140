use crate::domain::ThroughputSample;
use crate::ports::MetricStore;

/// Default number of samples kept (one minute at a 1 s poll interval)
pub const DEFAULT_CAPACITY: usize = 60;

/// Fixed-capacity ring buffer of throughput samples.
///
/// Slots are filled in order until the buffer is full; after that each new
/// sample overwrites the slot at `head`, which always holds the oldest one.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    slots: Vec<ThroughputSample>,
    head: usize,
    capacity: usize,
}

impl RollingHistory {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Iterate oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ThroughputSample> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}

impl MetricStore for RollingHistory {
    fn store(&mut self, sample: ThroughputSample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
            return;
        }

        self.slots[self.head] = sample;
        self.head = (self.head + 1) % self.capacity;
    }

    fn latest(&self) -> Option<ThroughputSample> {
        if self.slots.is_empty() {
            return None;
        }
        let newest = (self.head + self.slots.len() - 1) % self.slots.len();
        Some(self.slots[newest])
    }

    fn snapshot(&self) -> Vec<ThroughputSample> {
        self.iter().copied().collect()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
