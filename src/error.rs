//! Error types for the chat and its negotiation flows.

use crate::peer::state::NegotiationState;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // ----- payload decoding -----
    /// Nothing to decode
    #[error("payload is empty")]
    EmptyPayload,

    /// Payload text is not valid base64
    #[error("payload is not valid base64: {0}")]
    PayloadEncoding(#[from] base64::DecodeError),

    /// Payload looked gzip-compressed but could not be inflated
    #[error("payload could not be decompressed: {0}")]
    PayloadCompression(#[source] std::io::Error),

    /// Payload JSON does not describe a session and its candidates
    #[error("payload is not a valid session description: {0}")]
    PayloadFormat(#[from] serde_json::Error),

    // ----- negotiation -----
    /// The peer connection rejected an offer/answer/description call
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// A remote ICE candidate could not be applied
    #[error("failed to apply ICE candidate: {0}")]
    IceApplication(String),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: NegotiationState,
    },

    #[error("ICE gathering did not complete within {0:?}")]
    GatheringTimeout(Duration),

    // ----- chat -----
    #[error("no data channel available")]
    NoChannel,

    #[error("failed to send message: {0}")]
    Send(String),

    // ----- setup -----
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("webrtc error: {0}")]
    Transport(#[from] webrtc::Error),
}

impl Error {
    /// Malformed payload passed to `/join`; shown to the user rather than
    /// failing the negotiation.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::EmptyPayload
                | Error::PayloadEncoding(_)
                | Error::PayloadCompression(_)
                | Error::PayloadFormat(_)
        )
    }
}
