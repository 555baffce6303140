pub mod counter_source;
pub mod metric_store;

pub use counter_source::CounterSource;
pub use metric_store::MetricStore;
