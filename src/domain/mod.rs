pub mod network;
pub mod throughput;

pub use network::{CounterDelta, CounterSnapshot, InterfaceCounters, NetworkInterface};
pub use throughput::{
    bytes_to_megabits, bytes_to_megabytes, megabits_to_megabytes, megabytes_to_megabits, ConvertedSample,
    SpeedUnit, ThroughputSample, BYTES_PER_MEGABYTE,
};
