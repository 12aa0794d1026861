//! Telephony boundary: the bidirectional frame protocol and the
//! control-plane RPC contract.

pub mod control;
pub mod frame;

pub use control::{ControlPlane, ConferenceStatusEvent};
pub use frame::{DownlinkFrame, StartParameters, UplinkFrame};
