//! Session payload wire format.
//!
//! `base64(json(payload))`, optionally with the JSON gzipped first. Decoding
//! recognises gzip by its magic bytes so both forms are always accepted.

use crate::error::{Error, Result};
use crate::peer::types::SessionPayload;
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec {
    compress: bool,
}

impl PayloadCodec {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    pub fn encode(&self, payload: &SessionPayload) -> Result<String> {
        let json = serde_json::to_vec(payload)?;
        if !self.compress {
            return Ok(general_purpose::STANDARD.encode(json));
        }

        let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
        gz.write_all(&json)?;
        let compressed = gz.finish()?;
        Ok(general_purpose::STANDARD.encode(compressed))
    }

    pub fn decode(&self, encoded: &str) -> Result<SessionPayload> {
        decode_payload(encoded)
    }
}

/// Plain (uncompressed) encoding
pub fn encode_payload(payload: &SessionPayload) -> Result<String> {
    PayloadCodec::default().encode(payload)
}

pub fn decode_payload(encoded: &str) -> Result<SessionPayload> {
    // pasted blobs often pick up line breaks
    let compact: String = encoded.split_whitespace().collect();
    if compact.is_empty() {
        return Err(Error::EmptyPayload);
    }

    let raw = general_purpose::STANDARD.decode(compact.as_bytes())?;
    let json = if raw.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .map_err(Error::PayloadCompression)?;
        out
    } else {
        raw
    };

    Ok(serde_json::from_slice(&json)?)
}
