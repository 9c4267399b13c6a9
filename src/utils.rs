use crate::peer::types::ServerConfig;
use rand::Rng;
use sha2::{Digest, Sha256};

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Add the `stun:`/`turn:` scheme to an ICE server URL that has none
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    const SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];
    if SCHEMES.iter().any(|s| config.url.starts_with(s)) {
        config.url.clone()
    } else {
        let scheme = if config.r#type == "turn" {
            "turn:"
        } else {
            "stun:"
        };
        format!("{}{}", scheme, config.url)
    }
}

/// Short digest of a payload so both users can confirm a paste arrived
/// intact, e.g. `3f9a-07c2`.
pub fn payload_fingerprint(encoded: &str) -> String {
    let compact: String = encoded.split_whitespace().collect();
    let digest = Sha256::digest(compact.as_bytes());
    format!("{}-{}", hex::encode(&digest[..2]), hex::encode(&digest[2..4]))
}
