//! In-memory peer connection used by unit tests.

use crate::display::ChatDisplay;
use crate::error::{Error, Result};
use crate::peer::transport::{ChatChannel, PeerEvent, PeerEventSender, PeerTransport, Subscription};
use crate::peer::types::{GatheringState, IceCandidate, SessionDescription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

type Listener = Arc<Mutex<Option<PeerEventSender>>>;

pub struct MockTransport {
    events: Listener,
    gathering: Arc<Mutex<GatheringState>>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    offers: Mutex<Vec<bool>>,
    answers: Mutex<Vec<bool>>,
    applied: Mutex<Vec<IceCandidate>>,
    channels: Mutex<Vec<Arc<MockChannel>>>,
    local_candidates: Vec<IceCandidate>,
    failing_candidate: Option<String>,
    reject_remote: bool,
    stall_gathering: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(None)),
            gathering: Arc::new(Mutex::new(GatheringState::New)),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            offers: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            local_candidates: vec![
                IceCandidate::new("candidate:1 1 udp 2130706431 192.168.1.10 50000 typ host"),
                IceCandidate::new("candidate:2 1 udp 1694498815 203.0.113.10 50001 typ srflx"),
            ],
            failing_candidate: None,
            reject_remote: false,
            stall_gathering: false,
        }
    }

    /// `add_ice_candidate` fails for candidates containing `needle`
    pub fn fail_candidate(mut self, needle: &str) -> Self {
        self.failing_candidate = Some(needle.to_string());
        self
    }

    pub fn reject_remote_description(mut self) -> Self {
        self.reject_remote = true;
        self
    }

    /// Gathering starts but never completes
    pub fn stall_gathering(mut self) -> Self {
        self.stall_gathering = true;
        self
    }

    pub fn local_candidates(&self) -> Vec<IceCandidate> {
        self.local_candidates.clone()
    }

    pub fn offers(&self) -> Vec<bool> {
        self.offers.lock().clone()
    }

    pub fn answers(&self) -> Vec<bool> {
        self.answers.lock().clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.applied.lock().clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    pub fn channels(&self) -> Vec<Arc<MockChannel>> {
        self.channels.lock().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.events.lock().is_some()
    }

    /// Raise an event as if the engine had produced it
    pub fn emit(&self, event: PeerEvent) -> bool {
        emit(&self.events, event)
    }

    fn start_gathering(&self) {
        let events = self.events.clone();
        let gathering = self.gathering.clone();
        let candidates = self.local_candidates.clone();
        let stall = self.stall_gathering;

        tokio::spawn(async move {
            *gathering.lock() = GatheringState::Gathering;
            emit(&events, PeerEvent::GatheringStateChanged(GatheringState::Gathering));
            for candidate in candidates {
                tokio::task::yield_now().await;
                emit(&events, PeerEvent::CandidateDiscovered(Some(candidate)));
            }
            if stall {
                return;
            }
            tokio::task::yield_now().await;
            *gathering.lock() = GatheringState::Complete;
            emit(&events, PeerEvent::GatheringStateChanged(GatheringState::Complete));
            emit(&events, PeerEvent::CandidateDiscovered(None));
        });
    }
}

fn emit(listener: &Listener, event: PeerEvent) -> bool {
    match listener.lock().as_ref() {
        Some(tx) => tx.send(event).is_ok(),
        None => false,
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription> {
        self.offers.lock().push(ice_restart);
        Ok(SessionDescription::offer("v=0\r\ns=mock-offer\r\n"))
    }

    async fn create_answer(&self, ice_restart: bool) -> Result<SessionDescription> {
        if self.remote.lock().is_none() {
            return Err(Error::Negotiation("no remote offer".into()));
        }
        self.answers.lock().push(ice_restart);
        Ok(SessionDescription::answer("v=0\r\ns=mock-answer\r\n"))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        *self.local.lock() = Some(desc);
        self.start_gathering();
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        if self.reject_remote {
            return Err(Error::Negotiation("invalid session description".into()));
        }
        *self.remote.lock() = Some(desc);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        tokio::task::yield_now().await;
        if let Some(needle) = &self.failing_candidate {
            if candidate.candidate.contains(needle.as_str()) {
                return Err(Error::IceApplication(candidate.candidate));
            }
        }
        self.applied.lock().push(candidate);
        Ok(())
    }

    fn ice_gathering_state(&self) -> GatheringState {
        *self.gathering.lock()
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChatChannel>> {
        let channel = MockChannel::new(label);
        self.channels.lock().push(channel.clone());
        Ok(channel)
    }

    fn subscribe(&self, events: PeerEventSender) -> Subscription {
        *self.events.lock() = Some(events);
        let listener = self.events.clone();
        Subscription::new(move || {
            listener.lock().take();
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MockChannel {
    label: String,
    listener: Listener,
    sent: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl MockChannel {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            listener: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        })
    }

    /// A message arriving from the remote side. Returns whether anyone was
    /// listening.
    pub fn deliver(&self, text: &str) -> bool {
        emit(
            &self.listener,
            PeerEvent::MessageReceived {
                label: self.label.clone(),
                text: text.to_string(),
            },
        )
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl ChatChannel for MockChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        if *self.closed.lock() {
            return Err(Error::Send("channel closed".into()));
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn subscribe(&self, events: PeerEventSender) -> Subscription {
        *self.listener.lock() = Some(events);
        let listener = self.listener.clone();
        Subscription::new(move || {
            listener.lock().take();
        })
    }

    async fn close(&self) -> Result<()> {
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Display that keeps every line
#[derive(Default)]
pub struct RecordingDisplay {
    lines: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(text))
    }
}

impl ChatDisplay for RecordingDisplay {
    fn display_line(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }
}

/// Yield to spawned tasks until `cond` holds
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    cond()
}
