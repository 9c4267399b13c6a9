//! webrtc-rs backed peer connection and data channel.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logger::dump_selected_pair;
use crate::peer::transport::{ChatChannel, PeerEvent, PeerEventSender, PeerTransport, Subscription};
use crate::peer::types::{
    ConnectionState, GatheringState, IceCandidate, SdpType, SessionDescription,
};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::{
    api::APIBuilder,
    data_channel::{data_channel_init::RTCDataChannelInit, RTCDataChannel},
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription, RTCPeerConnection,
    },
};

pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    pub async fn new(config: &Config) -> Result<Self> {
        let api = APIBuilder::new().build();
        let pc = Arc::new(api.new_peer_connection(rtc_config(config)).await?);
        info!(
            "Peer connection created with {} ICE servers",
            config.ice_servers.len()
        );
        Ok(Self { pc })
    }
}

/// Peer connection configuration from the app config
fn rtc_config(config: &Config) -> RTCConfiguration {
    RTCConfiguration {
        ice_servers: config.rtc_ice_servers(),
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}

fn negotiation(err: webrtc::Error) -> Error {
    Error::Negotiation(err.to_string())
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let parsed = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    parsed.map_err(negotiation)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        other => {
            return Err(Error::Negotiation(format!(
                "unsupported session description type: {other}"
            )))
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

fn candidate_from_rtc(cand: &RTCIceCandidate) -> Option<IceCandidate> {
    match cand.to_json() {
        Ok(init) => Some(IceCandidate {
            candidate: init.candidate,
            sdp_mid: init.sdp_mid,
            sdp_mline_index: init.sdp_mline_index,
            username_fragment: init.username_fragment,
        }),
        Err(e) => {
            debug!("Failed to serialize local candidate: {e}");
            None
        }
    }
}

fn gathering_state(state: RTCIceGathererState) -> GatheringState {
    match state {
        RTCIceGathererState::Gathering => GatheringState::Gathering,
        RTCIceGathererState::Complete => GatheringState::Complete,
        _ => GatheringState::New,
    }
}

fn connection_state(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription> {
        // restarting before anything was gathered would start gathering
        // ahead of set_local_description
        let ice_restart = ice_restart && self.pc.local_description().await.is_some();
        let options = RTCOfferOptions {
            ice_restart,
            ..Default::default()
        };
        let offer = self.pc.create_offer(Some(options)).await.map_err(negotiation)?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self, ice_restart: bool) -> Result<SessionDescription> {
        // answers follow the offerer's ICE credentials; a restart is driven
        // by the offer side
        if ice_restart {
            debug!("ICE restart requested for answer, following remote offer");
        }
        let answer = self.pc.create_answer(None).await.map_err(negotiation)?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = to_rtc_description(desc)?;
        self.pc.set_local_description(desc).await.map_err(negotiation)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = to_rtc_description(desc)?;
        self.pc.set_remote_description(desc).await.map_err(negotiation)
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.local_description().await?;
        from_rtc_description(desc).ok()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(|e| Error::IceApplication(e.to_string()))
    }

    fn ice_gathering_state(&self) -> GatheringState {
        match self.pc.ice_gathering_state() {
            RTCIceGatheringState::Gathering => GatheringState::Gathering,
            RTCIceGatheringState::Complete => GatheringState::Complete,
            _ => GatheringState::New,
        }
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChatChannel>> {
        let dc = self
            .pc
            .create_data_channel(label, Some(RTCDataChannelInit::default()))
            .await?;
        Ok(Arc::new(WebRtcChannel { dc }))
    }

    fn subscribe(&self, events: PeerEventSender) -> Subscription {
        let tx = events.clone();
        self.pc
            .on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
                let candidate = cand.as_ref().and_then(candidate_from_rtc);
                // a candidate that failed to serialize is dropped, not
                // reported as end-of-gathering
                if cand.is_none() || candidate.is_some() {
                    let _ = tx.send(PeerEvent::CandidateDiscovered(candidate));
                }
                Box::pin(async {})
            }));

        let tx = events.clone();
        self.pc
            .on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
                debug!("ICE gathering state changed to: {:?}", state);
                let _ = tx.send(PeerEvent::GatheringStateChanged(gathering_state(state)));
                Box::pin(async {})
            }));

        let tx = events.clone();
        let pc_stats = Arc::downgrade(&self.pc);
        self.pc
            .on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
                info!("Peer connection state changed to: {:?}", st);
                let _ = tx.send(PeerEvent::ConnectionStateChanged(connection_state(st)));
                if st == RTCPeerConnectionState::Connected {
                    if let Some(pc) = pc_stats.upgrade() {
                        tokio::spawn(async move {
                            dump_selected_pair(&pc, "CONNECTED").await;
                        });
                    }
                }
                Box::pin(async {})
            }));

        let tx = events;
        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                info!("Remote peer opened data channel '{}'", dc.label());
                let _ = tx.send(PeerEvent::RemoteChannelOpened(Arc::new(WebRtcChannel { dc })));
                Box::pin(async {})
            }));

        let pc = Arc::downgrade(&self.pc);
        Subscription::new(move || {
            if let Some(pc) = pc.upgrade() {
                pc.on_ice_candidate(Box::new(|_| Box::pin(async {})));
                pc.on_ice_gathering_state_change(Box::new(|_| Box::pin(async {})));
                pc.on_peer_connection_state_change(Box::new(|_| Box::pin(async {})));
                pc.on_data_channel(Box::new(|_| Box::pin(async {})));
            }
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(self.pc.close().await?)
    }
}

pub struct WebRtcChannel {
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl ChatChannel for WebRtcChannel {
    fn label(&self) -> String {
        self.dc.label().to_string()
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.dc
            .send_text(text.to_string())
            .await
            .map(|_| ())
            .map_err(|e| Error::Send(e.to_string()))
    }

    fn subscribe(&self, events: PeerEventSender) -> Subscription {
        let label = self.label();

        let tx = events.clone();
        let open_label = label.clone();
        self.dc.on_open(Box::new(move || {
            let _ = tx.send(PeerEvent::ChannelOpened(open_label));
            Box::pin(async {})
        }));

        let tx = events.clone();
        let close_label = label.clone();
        self.dc.on_close(Box::new(move || {
            let _ = tx.send(PeerEvent::ChannelClosed(close_label.clone()));
            Box::pin(async {})
        }));

        let tx = events;
        self.dc.on_message(Box::new(move |msg: DataChannelMessage| {
            debug!("Received message on '{}', length: {}", label, msg.data.len());
            let text = String::from_utf8_lossy(&msg.data).to_string();
            let _ = tx.send(PeerEvent::MessageReceived {
                label: label.clone(),
                text,
            });
            Box::pin(async {})
        }));

        let dc = Arc::downgrade(&self.dc);
        Subscription::new(move || {
            if let Some(dc) = dc.upgrade() {
                dc.on_open(Box::new(|| Box::pin(async {})));
                dc.on_close(Box::new(|| Box::pin(async {})));
                dc.on_message(Box::new(|_| Box::pin(async {})));
            }
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(self.dc.close().await?)
    }
}
