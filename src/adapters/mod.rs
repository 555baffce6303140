#[cfg(test)]
pub mod fake;
pub mod store;
pub mod sysfs;

pub use store::{RollingHistory, DEFAULT_CAPACITY};
pub use sysfs::{SysfsConfig, SysfsCounterSource};
