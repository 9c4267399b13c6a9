//! Offer/answer negotiation over copy-pasted session payloads.
//!
//! The negotiator owns the peer connection handle, the buffer of locally
//! gathered ICE candidates and the active data channel. Peer-connection
//! notifications are processed in arrival order by a single pump task, so
//! by the time the gathering state reads `Complete` every candidate of that
//! round is already in the buffer.
//!
//! Each local description starts a numbered gathering round. The round
//! marker travels through the same queue as the engine's events, so a
//! `Complete` left over from an earlier round never satisfies a later wait.

use crate::config::{Config, DEFAULT_CHANNEL_LABEL};
use crate::display::ChatDisplay;
use crate::error::{Error, Result};
use crate::logger::dump_candidate;
use crate::peer::codec::PayloadCodec;
use crate::peer::data_channel::{hand_over, ActiveChannel};
use crate::peer::ice::{analyze_candidates, apply_remote_candidates, CandidateBuffer};
use crate::peer::state::NegotiationState;
use crate::peer::transport::{
    ChatChannel, PeerEvent, PeerEventReceiver, PeerEventSender, PeerTransport, Subscription,
};
use crate::peer::types::{
    ConnectionState, GatheringState, IceCandidate, SdpType, SessionPayload,
};
use crate::utils::random_id;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct NegotiatorOptions {
    pub channel_label: String,
    pub compress_payloads: bool,
    pub gather_timeout: Option<Duration>,
}

impl Default for NegotiatorOptions {
    fn default() -> Self {
        Self {
            channel_label: DEFAULT_CHANNEL_LABEL.to_string(),
            compress_payloads: false,
            gather_timeout: None,
        }
    }
}

impl From<&Config> for NegotiatorOptions {
    fn from(config: &Config) -> Self {
        Self {
            channel_label: config.channel_label.clone(),
            compress_payloads: config.compress_payloads,
            gather_timeout: config.gather_timeout(),
        }
    }
}

/// Result of applying a remote payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The payload was an answer to our offer; nothing left to send
    Completed,
    /// The payload was an offer; send this answer payload back
    Reply(String),
}

pub struct SessionNegotiator {
    transport: Arc<dyn PeerTransport>,
    inner: Arc<Inner>,
    codec: PayloadCodec,
    options: NegotiatorOptions,
    peer_subscription: Mutex<Option<Subscription>>,
    pump: JoinHandle<()>,
}

/// Gathering state as seen by the pump, tagged with the round it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GatheringRound {
    round: u64,
    state: GatheringState,
}

/// State shared with the event pump
struct Inner {
    id: String,
    candidates: Mutex<CandidateBuffer>,
    gathering: watch::Sender<GatheringRound>,
    /// Latest round handed to the pump; 0 before any local description
    round: AtomicU64,
    state: Mutex<NegotiationState>,
    channel: Mutex<Option<ActiveChannel>>,
    display: Arc<dyn ChatDisplay>,
    events: PeerEventSender,
}

impl SessionNegotiator {
    /// Subscribes to the transport and starts the event pump. Must be called
    /// inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        display: Arc<dyn ChatDisplay>,
        options: NegotiatorOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (gathering, _) = watch::channel(GatheringRound {
            round: 0,
            state: transport.ice_gathering_state(),
        });

        let inner = Arc::new(Inner {
            id: random_id(),
            candidates: Mutex::new(CandidateBuffer::default()),
            gathering,
            round: AtomicU64::new(0),
            state: Mutex::new(NegotiationState::Idle),
            channel: Mutex::new(None),
            display,
            events: tx.clone(),
        });
        info!("[{}] Session negotiator created", inner.id);

        let peer_subscription = transport.subscribe(tx);
        let pump = tokio::spawn(run_pump(inner.clone(), rx));

        Self {
            transport,
            inner,
            codec: PayloadCodec::new(options.compress_payloads),
            options,
            peer_subscription: Mutex::new(Some(peer_subscription)),
            pump,
        }
    }

    pub fn state(&self) -> NegotiationState {
        *self.inner.state.lock()
    }

    pub fn local_candidates(&self) -> Vec<IceCandidate> {
        self.inner.candidates.lock().snapshot()
    }

    pub fn active_channel_label(&self) -> Option<String> {
        self.inner.channel.lock().as_ref().map(|c| c.label())
    }

    /// Start hosting: create an offer, gather every local candidate and
    /// return the encoded payload for the remote peer.
    pub async fn host_session(&self) -> Result<String> {
        self.ensure(NegotiationState::can_host, "host a session")?;
        info!("[{}] Hosting session", self.inner.id);

        // the offer needs a data channel to carry an application section
        if self.inner.channel.lock().is_none() {
            let channel = self
                .transport
                .create_data_channel(&self.options.channel_label)
                .await?;
            *self.inner.channel.lock() = Some(ActiveChannel::attach(
                channel,
                self.inner.events.clone(),
            ));
        }

        let offer = self.transport.create_offer(true).await?;
        self.begin_gathering_round();
        self.transport.set_local_description(offer).await?;
        let payload = self.export_payload().await?;

        *self.inner.state.lock() = NegotiationState::OfferSent;
        Ok(payload)
    }

    /// Apply a payload from the remote peer. An answer completes our own
    /// offer; an offer is answered with a new payload to send back.
    pub async fn join_session(&self, encoded: &str) -> Result<JoinOutcome> {
        let payload = self.codec.decode(encoded)?;
        let role = payload.session.sdp_type;
        match role {
            SdpType::Answer => {
                self.ensure(NegotiationState::can_accept_answer, "apply an answer")?
            }
            SdpType::Offer => self.ensure(NegotiationState::can_accept_offer, "accept an offer")?,
        }
        info!(
            "[{}] Joining with remote {} carrying {} candidates",
            self.inner.id,
            role,
            payload.ice_candidates.len()
        );

        self.transport
            .set_remote_description(payload.session)
            .await?;
        apply_remote_candidates(self.transport.as_ref(), &payload.ice_candidates).await?;

        match role {
            SdpType::Answer => {
                *self.inner.state.lock() = NegotiationState::Connected;
                info!("[{}] Remote answer applied, negotiation complete", self.inner.id);
                Ok(JoinOutcome::Completed)
            }
            SdpType::Offer => {
                let answer = self.transport.create_answer(true).await?;
                self.begin_gathering_round();
                self.transport.set_local_description(answer).await?;
                let reply = self.export_payload().await?;

                *self.inner.state.lock() = NegotiationState::AnswerSent;
                Ok(JoinOutcome::Reply(reply))
            }
        }
    }

    /// Suspend until ICE gathering for the latest local description reaches
    /// `Complete`.
    pub async fn wait_for_ice_candidates(&self) -> Result<()> {
        let round = self.inner.round.load(Ordering::SeqCst);
        let mut rx = self.inner.gathering.subscribe();
        let is_complete =
            move |g: &GatheringRound| g.round == round && g.state == GatheringState::Complete;

        let waited = match self.options.gather_timeout {
            Some(limit) => match timeout(limit, rx.wait_for(is_complete)).await {
                Ok(res) => res.map(|_| ()),
                Err(_) => return Err(Error::GatheringTimeout(limit)),
            },
            None => rx.wait_for(is_complete).await.map(|_| ()),
        };
        waited.map_err(|_| Error::Negotiation("peer connection event stream closed".into()))
    }

    /// Record a locally discovered candidate; `None` ends a gathering round
    /// and is otherwise ignored.
    pub fn handle_candidate_discovered(&self, candidate: Option<IceCandidate>) {
        self.inner.handle_candidate_discovered(candidate);
    }

    /// The remote peer opened its own channel: listen there from now on.
    pub fn handle_remote_channel_opened(&self, channel: Arc<dyn ChatChannel>) {
        self.inner.handle_remote_channel_opened(channel);
    }

    /// Send a chat line over the active data channel
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let channel = self
            .inner
            .channel
            .lock()
            .as_ref()
            .map(ActiveChannel::channel)
            .ok_or(Error::NoChannel)?;
        channel.send_text(text).await
    }

    /// Release every subscription and close the channel and connection.
    pub async fn close(&self) -> Result<()> {
        info!("[{}] Closing session", self.inner.id);
        drop(self.peer_subscription.lock().take());
        let active = self.inner.channel.lock().take();
        if let Some(active) = active {
            let channel = active.channel();
            drop(active);
            if let Err(e) = channel.close().await {
                warn!("Failed to close data channel: {e}");
            }
        }
        self.pump.abort();
        self.transport.close().await
    }

    async fn export_payload(&self) -> Result<String> {
        debug!("[{}] Waiting for ICE candidates...", self.inner.id);
        self.wait_for_ice_candidates().await?;

        let session = self
            .transport
            .local_description()
            .await
            .ok_or_else(|| Error::Negotiation("no local description after gathering".into()))?;
        let ice_candidates = self.inner.candidates.lock().snapshot();
        info!(
            "[{}] Collected {} ICE candidates for {}",
            self.inner.id,
            ice_candidates.len(),
            session.sdp_type
        );
        analyze_candidates(&ice_candidates);

        self.codec.encode(&SessionPayload {
            session,
            ice_candidates,
        })
    }

    /// Open a new gathering round. Must happen before the local description
    /// is set so that every event of the round queues behind the marker.
    fn begin_gathering_round(&self) {
        let round = self.inner.round.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("[{}] Starting ICE gathering round {round}", self.inner.id);
        let _ = self.inner.events.send(PeerEvent::GatheringRoundStarted(round));
    }

    fn ensure(&self, allowed: fn(NegotiationState) -> bool, action: &'static str) -> Result<()> {
        let state = self.state();
        if allowed(state) {
            Ok(())
        } else {
            Err(Error::InvalidState { action, state })
        }
    }
}

impl Drop for SessionNegotiator {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn run_pump(inner: Arc<Inner>, mut rx: PeerEventReceiver) {
    while let Some(event) = rx.recv().await {
        inner.handle_event(event);
    }
}

impl Inner {
    fn handle_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::CandidateDiscovered(candidate) => self.handle_candidate_discovered(candidate),
            PeerEvent::GatheringRoundStarted(round) => {
                self.gathering.send_replace(GatheringRound {
                    round,
                    state: GatheringState::New,
                });
            }
            PeerEvent::GatheringStateChanged(state) => {
                debug!("[{}] ICE gathering state: {:?}", self.id, state);
                self.gathering.send_modify(|g| g.state = state);
            }
            PeerEvent::ConnectionStateChanged(state) => self.handle_connection_state(state),
            PeerEvent::RemoteChannelOpened(channel) => self.handle_remote_channel_opened(channel),
            PeerEvent::ChannelOpened(label) => {
                self.display
                    .display_line(&format!("Channel '{label}' is open, say hello!"));
            }
            PeerEvent::ChannelClosed(label) => {
                self.display
                    .display_line(&format!("Channel '{label}' closed"));
            }
            PeerEvent::MessageReceived { text, .. } => {
                self.display.display_line(&format!("peer: {text}"));
            }
        }
    }

    fn handle_candidate_discovered(&self, candidate: Option<IceCandidate>) {
        match candidate {
            Some(c) if !c.candidate.is_empty() => {
                dump_candidate("LOCAL", &c);
                let mut buffer = self.candidates.lock();
                buffer.push(c);
                debug!("[{}] Added ICE candidate, total count: {}", self.id, buffer.len());
            }
            _ => debug!("[{}] End of candidates for this gathering round", self.id),
        }
    }

    fn handle_remote_channel_opened(&self, channel: Arc<dyn ChatChannel>) {
        let mut slot = self.channel.lock();
        hand_over(&mut slot, channel, self.events.clone());
    }

    fn handle_connection_state(&self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                let mut current = self.state.lock();
                *current = current.on_connected();
                self.display.display_line("Peer connected");
            }
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Closed => {
                self.display
                    .display_line(&format!("Peer connection {state}"));
            }
            ConnectionState::New | ConnectionState::Connecting => {
                debug!("[{}] Peer connection state: {state}", self.id);
            }
        }
    }
}
