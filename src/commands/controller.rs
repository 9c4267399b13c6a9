use crate::commands::parser::{Command, HELP};
use crate::display::ChatDisplay;
use crate::error::{Error, Result};
use crate::negotiator::{JoinOutcome, SessionNegotiator};
use crate::utils::payload_fingerprint;
use log::{info, warn};
use std::future::Future;
use std::sync::Arc;

/// What the input loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Routes submitted lines to the negotiator or the data channel and writes
/// the results to the display.
pub struct ChatController {
    negotiator: SessionNegotiator,
    display: Arc<dyn ChatDisplay>,
}

impl ChatController {
    pub fn new(negotiator: SessionNegotiator, display: Arc<dyn ChatDisplay>) -> Self {
        Self {
            negotiator,
            display,
        }
    }

    pub fn negotiator(&self) -> &SessionNegotiator {
        &self.negotiator
    }

    /// Handle one submitted line. Negotiation failures are returned; the
    /// user restarts the flow with a new command.
    pub async fn submit(&self, line: &str) -> Result<Flow> {
        match Command::parse(line) {
            Command::Empty => {}
            Command::Host => {
                self.display.display_line("Gathering ICE candidates...");
                let payload = self.negotiator.host_session().await?;
                self.show_payload("offer", &payload);
            }
            Command::Join(encoded) => self.join(&encoded).await?,
            Command::Status => self.show_status(),
            Command::Help => HELP.iter().for_each(|l| self.display.display_line(l)),
            Command::Quit => return Ok(Flow::Quit),
            Command::MissingArgument(cmd) => {
                self.display
                    .display_line(&format!("Usage: /{cmd} <payload>"));
            }
            Command::Invalid(token) => {
                self.display
                    .display_line(&format!("Invalid Command: {token}"));
            }
            Command::Message(text) => self.send(&text).await,
        }
        Ok(Flow::Continue)
    }

    /// [`submit`](Self::submit) raced against `interrupt`. If the interrupt
    /// fires first the command is abandoned and the loop should quit.
    pub async fn submit_or_interrupt(
        &self,
        line: &str,
        interrupt: impl Future,
    ) -> Result<Flow> {
        tokio::select! {
            flow = self.submit(line) => flow,
            _ = interrupt => {
                warn!("Interrupted while handling {line:?}");
                Ok(Flow::Quit)
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.negotiator.close().await {
            warn!("Error while closing peer connection: {e}");
        }
    }

    async fn join(&self, encoded: &str) -> Result<()> {
        self.display.display_line(&format!(
            "Received payload {}",
            payload_fingerprint(encoded)
        ));
        match self.negotiator.join_session(encoded).await {
            Ok(JoinOutcome::Completed) => {
                self.display
                    .display_line("Answer applied, waiting for the connection to open");
            }
            Ok(JoinOutcome::Reply(reply)) => self.show_payload("answer", &reply),
            Err(e) if e.is_decode() => {
                info!("Rejected payload: {e}");
                self.display
                    .display_line(&format!("Could not read payload: {e}"));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn send(&self, text: &str) {
        match self.negotiator.send_message(text).await {
            Ok(()) => self.display.display_line(&format!("me: {text}")),
            Err(Error::NoChannel) => self
                .display
                .display_line("Not connected yet: use /host or /join <payload> first"),
            Err(e) => {
                warn!("Send failed: {e}");
                self.display.display_line(&format!("Message not sent: {e}"));
            }
        }
    }

    fn show_payload(&self, kind: &str, payload: &str) {
        self.display.display_line(&format!(
            "Send this {kind} to your peer (fingerprint {}):",
            payload_fingerprint(payload)
        ));
        self.display.display_line(payload);
    }

    fn show_status(&self) {
        let channel = self
            .negotiator
            .active_channel_label()
            .unwrap_or_else(|| "none".to_string());
        self.display.display_line(&format!(
            "State: {}, local candidates: {}, channel: {}",
            self.negotiator.state(),
            self.negotiator.local_candidates().len(),
            channel
        ));
    }
}
