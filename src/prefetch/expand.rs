//! Depth-limited expansion of one direction through the navigation graph.
//!
//! The walk keeps an explicit frontier of edge sets still to follow and a
//! set of in-flight neighbor fetches. Each completed fetch pushes the
//! neighbor's own edges back onto the frontier with one hop less.

use crate::algebras::GraphService;
use crate::error::AppError;
use crate::model::{Direction, Edge, EdgeStatus};
use crate::types::CaptureId;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;

/// Edges waiting to be followed, with the hops still allowed past them.
#[derive(Debug)]
struct FrontierEntry {
    edges: Vec<Edge>,
    remaining: u8,
}

/// What one expansion did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Number of `cache_capture` requests issued, duplicates included.
    pub requested: usize,
    /// Farthest hop at which a request was issued.
    pub deepest_hop: u8,
}

/// Follows `direction` outward from `edges` for at most `depth` hops,
/// asking `graph` to cache every capture it reaches.
///
/// Captures reachable along several paths are requested once per path;
/// the asset caches absorb the duplicates. The first failure ends the
/// whole expansion.
pub async fn expand(
    graph: &dyn GraphService,
    edges: Vec<Edge>,
    direction: Direction,
    depth: u8,
) -> Result<ExpansionReport, AppError> {
    let mut frontier = VecDeque::from([FrontierEntry {
        edges,
        remaining: depth,
    }]);
    let mut in_flight = FuturesUnordered::new();
    let mut report = ExpansionReport::default();

    loop {
        while let Some(entry) = frontier.pop_front() {
            if entry.remaining == 0 {
                continue;
            }
            let hop = depth - entry.remaining + 1;
            for edge in entry.edges.iter().filter(|e| e.direction == direction) {
                report.requested += 1;
                report.deepest_hop = report.deepest_hop.max(hop);
                in_flight.push(visit(
                    graph,
                    edge.target.clone(),
                    direction,
                    entry.remaining - 1,
                ));
            }
        }

        match in_flight.next().await {
            Some(result) => frontier.push_back(result?),
            None => return Ok(report),
        }
    }
}

/// Caches one neighbor and, if hops remain, reads its edges for the lane
/// once they are known.
async fn visit(
    graph: &dyn GraphService,
    target: CaptureId,
    direction: Direction,
    remaining: u8,
) -> Result<FrontierEntry, AppError> {
    let capture = graph.cache_capture(&target).await?;
    if remaining == 0 {
        return Ok(FrontierEntry {
            edges: Vec::new(),
            remaining,
        });
    }

    let mut statuses = if direction.is_sequential() {
        capture.watch_sequence_edges()?
    } else {
        capture.watch_spatial_edges()?
    };
    let status = statuses
        .wait_for(EdgeStatus::is_cached)
        .await
        .ok_or_else(|| AppError::Disposed(target.clone()))?;

    Ok(FrontierEntry {
        edges: status.into_edges(),
        remaining,
    })
}
