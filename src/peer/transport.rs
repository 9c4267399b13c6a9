//! The peer-connection capability the negotiator drives.
//!
//! Implemented over webrtc-rs in [`crate::peer::connection`]; tests use an
//! in-memory double.

use crate::error::Result;
use crate::peer::types::{ConnectionState, GatheringState, IceCandidate, SessionDescription};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Notifications raised by a peer connection or one of its data channels.
///
/// Delivered in the order they happened: every `CandidateDiscovered(Some)`
/// of a gathering round arrives before the round's `Complete` state.
pub enum PeerEvent {
    /// `None` marks the end of a gathering round
    CandidateDiscovered(Option<IceCandidate>),
    /// Queued by the negotiator right before it sets a local description.
    /// Gathering events behind it belong to round `n`.
    GatheringRoundStarted(u64),
    GatheringStateChanged(GatheringState),
    ConnectionStateChanged(ConnectionState),
    RemoteChannelOpened(Arc<dyn ChatChannel>),
    ChannelOpened(String),
    ChannelClosed(String),
    MessageReceived { label: String, text: String },
}

pub type PeerEventSender = mpsc::UnboundedSender<PeerEvent>;
pub type PeerEventReceiver = mpsc::UnboundedReceiver<PeerEvent>;

#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription>;
    async fn create_answer(&self, ice_restart: bool) -> Result<SessionDescription>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;
    fn ice_gathering_state(&self) -> GatheringState;
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChatChannel>>;

    /// Route candidate, gathering, connection and remote-channel
    /// notifications into `events` until the returned handle is dropped.
    fn subscribe(&self, events: PeerEventSender) -> Subscription;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait ChatChannel: Send + Sync {
    fn label(&self) -> String;
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Route open/close/message notifications of this channel into `events`
    /// until the returned handle is dropped.
    fn subscribe(&self, events: PeerEventSender) -> Subscription;

    async fn close(&self) -> Result<()>;
}

/// Owned unsubscribe handle; the registration is undone on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}
