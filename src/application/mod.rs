pub mod monitoring;
pub mod sampler;
pub mod session;

pub use monitoring::{MonitorStatus, MonitoringService};
pub use sampler::{validate_interface, SpeedSampler};
pub use session::{LoadReport, SessionStore, StorageStatus};
