use clap::Parser;
use paste_chat::config::Config;
use paste_chat::peer::ServerConfig;
use paste_chat::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paste-chat")]
#[command(version)]
#[command(about = "Peer-to-peer chat over WebRTC, signaled by copy-paste", long_about = None)]
pub struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// ICE server URL, repeatable; replaces the configured servers
    #[arg(long = "ice-server", value_name = "URL")]
    pub ice_servers: Vec<String>,

    /// Username for TURN servers given with --ice-server
    #[arg(long)]
    pub turn_username: Option<String>,

    /// Credential for TURN servers given with --ice-server
    #[arg(long)]
    pub turn_credential: Option<String>,

    /// Gzip payloads before base64 encoding
    #[arg(long, action)]
    pub compress: bool,

    /// Give up on ICE gathering after this many seconds
    #[arg(long, value_name = "SECS")]
    pub gather_timeout: Option<u64>,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,
}

impl Args {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if !self.ice_servers.is_empty() {
            config.ice_servers = self
                .ice_servers
                .iter()
                .enumerate()
                .map(|(i, url)| self.server_from_url(i, url))
                .collect();
        }
        if self.compress {
            config.compress_payloads = true;
        }
        if self.gather_timeout.is_some() {
            config.gather_timeout_secs = self.gather_timeout;
        }

        config.validate()?;
        Ok(config)
    }

    fn server_from_url(&self, index: usize, url: &str) -> ServerConfig {
        let is_turn = url.starts_with("turn:") || url.starts_with("turns:");
        ServerConfig {
            id: format!("cli-{index}"),
            r#type: if is_turn { "turn" } else { "stun" }.into(),
            url: url.to_string(),
            username: is_turn.then(|| self.turn_username.clone()).flatten(),
            credential: is_turn.then(|| self.turn_credential.clone()).flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste_chat::Error;

    #[test]
    fn defaults_without_flags() {
        let args = Args::parse_from(["paste-chat"]);
        assert_eq!(args.load_config().unwrap(), Config::default());
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "paste-chat",
            "--ice-server",
            "stun:stun.example.org:3478",
            "--ice-server",
            "turn:turn.example.org:3478",
            "--turn-username",
            "bob",
            "--turn-credential",
            "pw",
            "--compress",
            "--gather-timeout",
            "20",
        ]);
        let config = args.load_config().unwrap();

        assert_eq!(config.ice_servers.len(), 2);
        assert_eq!(config.ice_servers[0].r#type, "stun");
        assert_eq!(config.ice_servers[0].username, None);
        assert_eq!(config.ice_servers[1].r#type, "turn");
        assert_eq!(config.ice_servers[1].username.as_deref(), Some("bob"));
        assert!(config.compress_payloads);
        assert_eq!(config.gather_timeout_secs, Some(20));
    }

    #[test]
    fn turn_url_without_credentials_fails_validation() {
        let args = Args::parse_from(["paste-chat", "--ice-server", "turn:turn.example.org"]);
        assert!(matches!(args.load_config(), Err(Error::Config(_))));
    }
}
