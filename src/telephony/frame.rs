//! Telephony stream frame kinds.
//!
//! Downlink frames arrive from the telephony service; uplink frames are
//! sent back over the same duplex stream. Payloads are μ-law 8 kHz mono,
//! base64-encoded on the wire.

use serde::{Deserialize, Serialize};

/// Custom parameters carried on a `start` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartParameters {
    pub from: Option<String>,
    pub to: Option<String>,
    pub appointment_id: Option<String>,
    pub conference_id: Option<String>,
    pub role: Option<ParticipantRole>,
}

/// Which leg of a conference a stream represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Caller,
    Owner,
}

/// A frame arriving from the telephony service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum DownlinkFrame {
    Connected,
    Start {
        stream_id: String,
        call_id: String,
        #[serde(default)]
        parameters: StartParameters,
    },
    Media {
        stream_id: String,
        /// base64-encoded μ-law payload.
        payload: String,
    },
    Stop {
        call_id: String,
    },
}

/// A frame sent back to the telephony service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum UplinkFrame {
    Media {
        stream_id: String,
        payload: String,
    },
    Mark {
        stream_id: String,
        name: String,
    },
    Clear {
        stream_id: String,
    },
    Dtmf {
        stream_id: String,
        digit: char,
    },
}
