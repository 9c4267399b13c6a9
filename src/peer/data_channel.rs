use crate::peer::transport::{ChatChannel, PeerEventSender, Subscription};
use log::info;
use std::sync::Arc;

/// The data channel chat messages currently flow over, together with its
/// notification subscription. Dropping it unsubscribes.
pub struct ActiveChannel {
    channel: Arc<dyn ChatChannel>,
    _subscription: Subscription,
}

impl ActiveChannel {
    /// Subscribe to `channel` and make it the one we listen on
    pub fn attach(channel: Arc<dyn ChatChannel>, events: PeerEventSender) -> Self {
        info!("Attaching data channel '{}'", channel.label());
        let subscription = channel.subscribe(events);
        Self {
            channel,
            _subscription: subscription,
        }
    }

    pub fn channel(&self) -> Arc<dyn ChatChannel> {
        self.channel.clone()
    }

    pub fn label(&self) -> String {
        self.channel.label()
    }
}

/// Swap the active channel for `next`. The previous channel's subscription
/// is released before the new one is registered.
pub fn hand_over(
    slot: &mut Option<ActiveChannel>,
    next: Arc<dyn ChatChannel>,
    events: PeerEventSender,
) {
    if let Some(previous) = slot.take() {
        info!(
            "Remote peer opened '{}', releasing '{}'",
            next.label(),
            previous.label()
        );
    }
    *slot = Some(ActiveChannel::attach(next, events));
}
