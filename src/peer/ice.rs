use crate::error::Result;
use crate::peer::transport::PeerTransport;
use crate::peer::types::IceCandidate;
use futures::future::try_join_all;
use log::{debug, info, warn};

/// Local candidates discovered over the negotiator's lifetime.
///
/// Append-only: candidates from every gathering round stay here, so an
/// answer exported after an earlier offer carries both rounds.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    candidates: Vec<IceCandidate>,
}

impl CandidateBuffer {
    pub fn push(&mut self, candidate: IceCandidate) {
        self.candidates.push(candidate);
    }

    pub fn snapshot(&self) -> Vec<IceCandidate> {
        self.candidates.clone()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Applies every remote candidate concurrently and waits for all of them.
///
/// The first failure fails the whole batch; candidates already added stay
/// added.
pub async fn apply_remote_candidates(
    transport: &dyn PeerTransport,
    candidates: &[IceCandidate],
) -> Result<()> {
    debug!("Applying {} remote candidates", candidates.len());
    try_join_all(candidates.iter().map(|candidate| {
        debug!("Applying remote candidate: {}", candidate.candidate);
        transport.add_ice_candidate(candidate.clone())
    }))
    .await?;
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
}

pub fn analyze_candidates(candidates: &[IceCandidate]) -> CandidateSummary {
    let mut summary = CandidateSummary::default();

    for candidate in candidates {
        if candidate.candidate.contains("typ host") {
            summary.host += 1;
        } else if candidate.candidate.contains("typ srflx") {
            summary.srflx += 1;
        } else if candidate.candidate.contains("typ relay") {
            summary.relay += 1;
        }
    }

    info!(
        "Candidate analysis: {} host, {} srflx, {} relay",
        summary.host, summary.srflx, summary.relay
    );

    if summary.relay == 0 {
        warn!("No TURN relay candidates found! Connection through NAT may fail.");
    }
    summary
}
