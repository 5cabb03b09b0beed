pub mod engine;

pub use engine::ComputeEngine;
