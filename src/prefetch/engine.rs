use crate::algebras::GraphService;
use crate::cache::{Replay, Subscription};
use crate::error::AppError;
use crate::model::{Capture, Direction, Edge, EdgeStatus, Lane};
use crate::prefetch::depth::CacheDepth;
use crate::prefetch::expand::expand;
use crate::types::CaptureId;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};

/// Keeps the neighborhood of the current capture warm.
///
/// While active, every new current capture replaces the previous one's
/// pipelines. Each pipeline watches one kind of edge on the current capture
/// and, whenever those edges or the configured depth change, abandons its
/// walk and starts a fresh one.
pub struct Prefetcher {
    graph: Arc<dyn GraphService>,
    depth: Arc<Replay<CacheDepth>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Prefetcher {
    pub fn new(graph: Arc<dyn GraphService>) -> Self {
        Self::with_depth(graph, CacheDepth::default())
    }

    pub fn with_depth(graph: Arc<dyn GraphService>, depth: CacheDepth) -> Self {
        Self {
            graph,
            depth: Arc::new(Replay::new(depth)),
            driver: Mutex::new(None),
        }
    }

    /// The depth as configured, before clamping.
    pub fn depth(&self) -> CacheDepth {
        self.depth.current()
    }

    /// Replaces the configured depth. Running walks restart with it.
    pub fn set_depth(&self, depth: CacheDepth) {
        if !depth.is_clamped() {
            log::warn!(
                "Prefetch depth {:?} exceeds lane maxima; using {:?}",
                depth,
                depth.clamped()
            );
        }
        self.depth.publish(depth);
    }

    /// Starts following `current`. Has no effect while already active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&self, current: Subscription<Option<Arc<Capture>>>) {
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            log::debug!("Prefetcher already active");
            return;
        }

        log::info!("Prefetcher activated");
        *driver = Some(tokio::spawn(drive(
            Arc::clone(&self.graph),
            Arc::clone(&self.depth),
            current,
        )));
    }

    /// Stops every pipeline. Asset fetches already handed to caches run on.
    pub fn deactivate(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
            log::info!("Prefetcher deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.driver
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Switches pipelines to each new current capture until the publisher goes away.
async fn drive(
    graph: Arc<dyn GraphService>,
    depth: Arc<Replay<CacheDepth>>,
    mut current: Subscription<Option<Arc<Capture>>>,
) {
    let mut pipelines = JoinSet::new();

    while let Some(capture) = current.next().await {
        pipelines.shutdown().await;
        let Some(capture) = capture else {
            log::debug!("No current capture; prefetching paused");
            continue;
        };

        log::info!("Prefetching around {}", capture.id());
        pipelines.spawn(sequence_pipeline(
            Arc::clone(&graph),
            Arc::clone(&capture),
            depth.subscribe(),
        ));
        pipelines.spawn(spatial_pipeline(
            Arc::clone(&graph),
            capture,
            depth.subscribe(),
        ));
    }

    log::debug!("Current capture stream ended");
    pipelines.shutdown().await;
}

async fn sequence_pipeline(
    graph: Arc<dyn GraphService>,
    capture: Arc<Capture>,
    depth: Subscription<CacheDepth>,
) {
    let statuses = match capture.watch_sequence_edges() {
        Ok(statuses) => statuses,
        Err(e) => {
            log::error!("Cannot watch sequence edges of {}: {}", capture.id(), e);
            return;
        }
    };

    let origin = capture.id().clone();
    follow_latest(statuses, depth, move |edges, depth| {
        let hops = depth.for_lane(Lane::Sequence, false);
        let lanes = [Direction::Next, Direction::Prev]
            .into_iter()
            .map(|direction| (direction, hops))
            .collect();
        run_lanes(Arc::clone(&graph), origin.clone(), edges, lanes)
    })
    .await;
}

async fn spatial_pipeline(
    graph: Arc<dyn GraphService>,
    capture: Arc<Capture>,
    depth: Subscription<CacheDepth>,
) {
    if !capture.is_complete() {
        log::debug!("Waiting for {} to complete before spatial prefetch", capture.id());
    }
    let spherical = match capture.wait_for_spatial().await {
        Ok(spatial) => spatial.camera_type.is_spherical(),
        Err(e) => {
            log::error!("Cannot read camera type of {}: {}", capture.id(), e);
            return;
        }
    };
    let statuses = match capture.watch_spatial_edges() {
        Ok(statuses) => statuses,
        Err(e) => {
            log::error!("Cannot watch spatial edges of {}: {}", capture.id(), e);
            return;
        }
    };

    let origin = capture.id().clone();
    follow_latest(statuses, depth, move |edges, depth| {
        let lanes = std::iter::once(Direction::Spherical)
            .chain(Direction::STEPS)
            .chain(Direction::TURNS)
            .filter_map(|direction| {
                let lane = direction.lane()?;
                Some((direction, depth.for_lane(lane, spherical)))
            })
            .collect();
        run_lanes(Arc::clone(&graph), origin.clone(), edges, lanes)
    })
    .await;
}

/// Runs `walk` for the latest cached edges and the latest depth, starting
/// over whenever either changes. Uncached statuses are skipped.
async fn follow_latest<F, Fut>(
    mut statuses: Subscription<EdgeStatus>,
    mut depth: Subscription<CacheDepth>,
    mut walk: F,
) where
    F: FnMut(Vec<Edge>, CacheDepth) -> Fut,
    Fut: Future<Output = ()>,
{
    let Some(mut status) = statuses.wait_for(EdgeStatus::is_cached).await else {
        return;
    };
    let Some(mut config) = depth.next().await else {
        return;
    };

    loop {
        let run = walk(status.edges().to_vec(), config);
        tokio::pin!(run);
        let mut finished = false;

        loop {
            tokio::select! {
                _ = &mut run, if !finished => finished = true,
                next = statuses.next() => match next {
                    Some(next) if next.is_cached() => {
                        status = next;
                        break;
                    }
                    Some(_) => {}
                    None => return,
                },
                next = depth.next() => match next {
                    Some(next) => {
                        config = next;
                        break;
                    }
                    None => return,
                },
            }
        }
    }
}

/// Expands every lane concurrently. A failing lane is logged and ends on
/// its own; the others carry on.
async fn run_lanes(
    graph: Arc<dyn GraphService>,
    origin: CaptureId,
    edges: Vec<Edge>,
    lanes: Vec<(Direction, u8)>,
) {
    let walks = lanes
        .into_iter()
        .filter(|(_, hops)| *hops > 0)
        .map(|(direction, hops)| {
            let graph = Arc::clone(&graph);
            let origin = origin.clone();
            let edges = edges.clone();
            async move {
                match expand(graph.as_ref(), edges, direction, hops).await {
                    Ok(report) => log::debug!(
                        "Prefetched {} {} neighbor(s) of {} up to hop {}",
                        report.requested,
                        direction,
                        origin,
                        report.deepest_hop
                    ),
                    Err(e) => log::log!(
                        lane_failure_level(&e),
                        "Prefetching {} from {} failed: {}",
                        direction,
                        origin,
                        e
                    ),
                }
            }
        });

    futures::future::join_all(walks).await;
}

/// Flaky transport failures are expected while moving through the graph;
/// anything else points at bad data or a broken graph service.
fn lane_failure_level(error: &AppError) -> log::Level {
    if error.is_transient() {
        log::Level::Warn
    } else {
        log::Level::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebras::FetchError;

    #[test]
    fn transient_lane_failures_log_as_warnings() {
        let timeout: AppError = FetchError::HttpStatus {
            status: 503,
            url: "https://assets.test/X.png".to_string(),
        }
        .into();
        let missing = AppError::CaptureNotFound(CaptureId::parse("X").unwrap());

        assert_eq!(lane_failure_level(&timeout), log::Level::Warn);
        assert_eq!(lane_failure_level(&missing), log::Level::Error);
    }
}
