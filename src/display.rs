//! Text surface of the chat: an append-only log and a line input.

use crate::error::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Append-only message log
pub trait ChatDisplay: Send + Sync {
    fn display_line(&self, text: &str);
}

/// Prints each line to stdout with a local timestamp.
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl ChatDisplay for TerminalDisplay {
    fn display_line(&self, text: &str) {
        let now = chrono::Local::now();
        let mut out = std::io::stdout().lock();
        // a closed stdout just means nobody is reading the log anymore
        let _ = writeln!(out, "[{}] {}", now.format("%H:%M:%S"), text);
        let _ = out.flush();
    }
}

/// Lines the user confirms with Enter.
pub struct TerminalInput {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalInput {
    pub fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` once stdin is closed. Cancel-safe.
    pub async fn read_submitted_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}
