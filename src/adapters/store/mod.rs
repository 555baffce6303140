pub mod csv;
pub mod memory;

pub use memory::{RollingHistory, DEFAULT_CAPACITY};
