pub mod collector;
pub mod summary;

pub use collector::MetricsCollector;
pub use summary::MetricsSummary;
