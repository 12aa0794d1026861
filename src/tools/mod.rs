//! Tool surface offered to the language service: calendar lookups and
//! the session-mutating tools (transfer, DTMF, hang-up, appointment
//! status), dispatched through a per-session [`registry::ToolRegistry`].

pub mod calendar;
pub mod registry;
pub mod session_tools;
pub mod types;

pub use registry::ToolRegistry;
pub use session_tools::{HangUpCallTool, SendDtmfTool, TransferToHumanTool, UpdateAppointmentStatusTool};
pub use types::{Tool, ToolContext, ToolResult};
