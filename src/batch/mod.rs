pub mod builder;

pub use builder::{BatchBuilder, BatchPlan};
