//! paste-chat - terminal front end
//!
//! One side types `/host` and copies the printed payload to the other side,
//! which runs `/join <payload>` and copies the answer back the same way.

mod args;

use args::Args;
use clap::Parser;
use log::{error, info};
use paste_chat::commands::{ChatController, Flow};
use paste_chat::display::{ChatDisplay, TerminalDisplay, TerminalInput};
use paste_chat::peer::WebRtcTransport;
use paste_chat::{logger, NegotiatorOptions, SessionNegotiator};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init(args.verbose);
    info!("paste-chat v{}", env!("CARGO_PKG_VERSION"));

    let config = args.load_config()?;
    let display: Arc<dyn ChatDisplay> = Arc::new(TerminalDisplay);
    let transport = Arc::new(WebRtcTransport::new(&config).await?);
    let negotiator =
        SessionNegotiator::new(transport, display.clone(), NegotiatorOptions::from(&config));
    let controller = ChatController::new(negotiator, display.clone());

    display.display_line("Type /host to start a session or /join <payload> to answer one (/help)");

    let mut input = TerminalInput::stdin();
    loop {
        let line = tokio::select! {
            line = input.read_submitted_line() => line?,
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else { break };

        // a stalled negotiation must not swallow Ctrl-C
        match controller.submit_or_interrupt(&line, signal::ctrl_c()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                error!("Command failed: {e}");
                display.display_line(&format!("Error: {e}"));
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
