use std::fmt;

/// Where this side is in the offer/answer exchange.
///
/// Hosting side: `Idle -> OfferSent -> Connected` once the answer is applied.
/// Joining side: `Idle -> AnswerSent -> Connected` once the peer connection
/// reports connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    OfferSent,
    AnswerSent,
    Connected,
}

impl NegotiationState {
    pub fn can_host(self) -> bool {
        self == NegotiationState::Idle
    }

    /// A remote offer is only accepted by a side that has not negotiated yet.
    pub fn can_accept_offer(self) -> bool {
        self == NegotiationState::Idle
    }

    /// A remote answer only makes sense after our own offer went out.
    pub fn can_accept_answer(self) -> bool {
        self == NegotiationState::OfferSent
    }

    /// Peer connection reported connected.
    pub fn on_connected(self) -> NegotiationState {
        match self {
            NegotiationState::OfferSent | NegotiationState::AnswerSent => {
                NegotiationState::Connected
            }
            other => other,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::OfferSent => "offer sent",
            NegotiationState::AnswerSent => "answer sent",
            NegotiationState::Connected => "connected",
        };
        f.write_str(s)
    }
}
