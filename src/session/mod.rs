//! The Session Orchestrator and Session Registry: the per-call
//! coordinator and the map from telephony stream id to coordinator.

pub mod orchestrator;
pub mod registry;

pub use orchestrator::{Session, SessionRole};
pub use registry::SessionRegistry;
