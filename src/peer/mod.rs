pub mod codec;
pub mod connection;
pub mod data_channel;
pub mod ice;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use codec::{decode_payload, encode_payload, PayloadCodec};
pub use connection::WebRtcTransport;
pub use state::NegotiationState;
pub use transport::{ChatChannel, PeerEvent, PeerTransport, Subscription};
pub use types::{IceCandidate, SdpType, ServerConfig, SessionDescription, SessionPayload};
