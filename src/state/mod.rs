pub mod checkpoint;
pub mod system_state;

pub use checkpoint::Checkpoint;
pub use system_state::SystemState;
