use crate::peer::types::IceCandidate;
use log::{debug, LevelFilter};
use std::io::Write;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::stats::StatsReportType;

/// Environment variable overriding the log filter, `env_logger` syntax
pub const LOG_ENV: &str = "PASTE_CHAT_LOG";

/// Timestamped logging
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else if crate::config::LOGGING_ENABLED {
        "info"
    } else {
        "warn"
    };

    let _ = env_logger::Builder::new()
        .parse_filters(&std::env::var(LOG_ENV).unwrap_or_else(|_| default_level.to_string()))
        .filter_module("webrtc_ice", LevelFilter::Error)
        .filter_module("webrtc_mdns", LevelFilter::Error)
        .filter_module("webrtc_dtls", LevelFilter::Error)
        .filter_module("webrtc_sctp", LevelFilter::Error)
        .format(|buf, record| {
            writeln!(
                buf,
                "RUST: [{}] {:<5} {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

/// Print an ICE candidate as it shows up
pub fn dump_candidate(label: &str, cand: &IceCandidate) {
    debug!(
        "Trickle {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?} username_fragment={:?}",
        cand.candidate, cand.sdp_mid, cand.sdp_mline_index, cand.username_fragment
    );
}

/// Quick getStats snapshot of the selected candidate pair
pub async fn dump_selected_pair(pc: &RTCPeerConnection, moment: &str) {
    let stats = pc.get_stats().await;
    for (_, v) in stats.reports {
        if let StatsReportType::CandidatePair(pair) = v {
            if pair.nominated {
                debug!(
                    "STATS {moment}: {}:{}  type: {:?}  bytes={}/{} state={:?}",
                    pair.local_candidate_id,
                    pair.remote_candidate_id,
                    pair.stats_type,
                    pair.bytes_sent,
                    pair.bytes_received,
                    pair.state
                );
            }
        }
    }
}
