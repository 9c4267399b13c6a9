//! Peer-to-peer chat over a WebRTC data channel, signaled by hand: each side
//! copies a base64 session payload to the other.

pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod logger;
pub mod negotiator;
pub mod peer;
pub mod utils;

pub use error::{Error, Result};
pub use negotiator::{JoinOutcome, NegotiatorOptions, SessionNegotiator};
