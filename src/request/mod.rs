pub mod arrival;
pub mod generator;
pub mod request;
pub mod status;
pub mod trace;

pub use arrival::{ArrivalQueue, ArrivalRecord};
pub use generator::WorkloadGenerator;
pub use request::{Request, RequestId};
pub use status::RequestStatus;
pub use trace::RequestTrace;
