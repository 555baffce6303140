use crate::domain::{InterfaceCounters, NetworkInterface};

/// Port for reading per-interface state and cumulative byte counters.
///
/// `Ok(None)` means the interface is absent from the OS interface table;
/// `Err` is reserved for read failures on an interface that does exist.
pub trait CounterSource: Send + Sync {
    /// Whether the interface is up, or `None` if it does not exist
    fn interface_state(&self, name: &str) -> Result<Option<bool>, Box<dyn std::error::Error + Send + Sync>>;

    /// Current cumulative counters, or `None` if the interface does not exist
    fn read_counters(
        &self,
        name: &str,
    ) -> Result<Option<InterfaceCounters>, Box<dyn std::error::Error + Send + Sync>>;

    /// List all network interfaces with statistics
    fn list_interfaces(&self) -> Result<Vec<NetworkInterface>, Box<dyn std::error::Error + Send + Sync>>;
}
