// tests/prefetch_scenarios.rs
// End-to-end prefetch behavior over an in-memory graph.

mod common;

use capture_prefetch::{
    AssetCache, CacheDepth, CameraType, Capture, Direction, Edge, GraphService, MemoryGraph,
    Prefetcher, Replay,
};
use common::{
    core_capture, eventually, id, memory_graph, memory_graph_over, settle, spatial, FailingGraph,
    FixtureBuilder, RecordingSource,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Prefetched ids, excluding the ones the test cached itself.
fn prefetched(graph: &MemoryGraph, excluding: &[&str]) -> Vec<String> {
    graph
        .requests()
        .into_iter()
        .map(|(id, _)| id.to_string())
        .filter(|id| !excluding.contains(&id.as_str()))
        .collect()
}

async fn start(
    graph: &Arc<MemoryGraph>,
    capture: &str,
    depth: CacheDepth,
) -> (Prefetcher, Replay<Option<Arc<Capture>>>) {
    let current = graph.cache_capture(&id(capture)).await.unwrap();
    let channel = Replay::new(Some(current));
    let prefetcher = Prefetcher::with_depth(Arc::clone(graph) as Arc<dyn GraphService>, depth);
    prefetcher.activate(channel.subscribe());
    (prefetcher, channel)
}

#[tokio::test]
async fn sequence_depth_two_fetches_two_ahead() {
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &["A", "B", "C", "D"]).build());

    let (prefetcher, _current) = start(&graph, "A", CacheDepth::new(2, 0, 0, 0)).await;

    eventually("B and C prefetched", || graph.request_count(&id("C")) > 0).await;
    settle().await;

    assert_eq!(prefetched(&graph, &["A"]), vec!["B", "C"]);
    assert_eq!(graph.request_count(&id("D")), 0);
    assert!(prefetcher.is_active());
}

#[tokio::test]
async fn sequence_walks_both_directions() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s", &["A", "B", "C", "D", "E"])
            .build(),
    );

    let (_prefetcher, _current) = start(&graph, "C", CacheDepth::new(1, 0, 0, 0)).await;

    eventually("neighbors prefetched", || {
        graph.request_count(&id("B")) > 0 && graph.request_count(&id("D")) > 0
    })
    .await;
    settle().await;

    assert_eq!(prefetched(&graph, &["C"]), vec!["B", "D"]);
}

#[tokio::test]
async fn oversized_sequence_depth_is_clamped() {
    let chain = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &chain).build());

    let (prefetcher, _current) = start(&graph, "A", CacheDepth::new(10, 0, 0, 0)).await;

    eventually("four ahead prefetched", || graph.request_count(&id("E")) > 0).await;
    settle().await;

    assert_eq!(prefetched(&graph, &["A"]), vec!["B", "C", "D", "E"]);
    assert_eq!(prefetcher.depth().sequence, 10);
}

#[tokio::test]
async fn spherical_current_skips_step_and_turn_lanes() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence_of("pano", &["P", "Q"], CameraType::Spherical)
            .sequence("walk", &["S1", "S2"])
            .edge("P", "Q", Direction::Spherical)
            .edge("P", "S1", Direction::StepForward)
            .edge("P", "S2", Direction::TurnLeft)
            .build(),
    );

    let (_prefetcher, _current) = start(&graph, "P", CacheDepth::new(0, 1, 3, 1)).await;

    eventually("spherical neighbor prefetched", || {
        graph.request_count(&id("Q")) > 0
    })
    .await;
    settle().await;

    assert_eq!(graph.request_count(&id("S1")), 0);
    assert_eq!(graph.request_count(&id("S2")), 0);
}

#[tokio::test]
async fn step_and_turn_lanes_run_around_perspective_capture() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s", &["A", "F1", "F2", "L1"])
            .edge("A", "F1", Direction::StepForward)
            .edge("F1", "F2", Direction::StepForward)
            .edge("A", "L1", Direction::TurnLeft)
            .build(),
    );

    let (_prefetcher, _current) = start(&graph, "A", CacheDepth::new(0, 0, 2, 1)).await;

    eventually("step and turn neighbors prefetched", || {
        graph.request_count(&id("F2")) > 0 && graph.request_count(&id("L1")) > 0
    })
    .await;
    settle().await;

    assert_eq!(prefetched(&graph, &["A"]), vec!["F1", "F2", "L1"]);
}

#[tokio::test]
async fn failing_lane_does_not_stop_the_others() {
    let inner = memory_graph(
        FixtureBuilder::new()
            .sequence("s", &["A", "X", "T"])
            .edge("A", "X", Direction::StepForward)
            .edge("A", "T", Direction::TurnRight)
            .build(),
    );
    let graph = Arc::new(FailingGraph::new(Arc::clone(&inner), &["X"]));

    let current = inner.cache_capture(&id("A")).await.unwrap();
    let channel = Replay::new(Some(current));
    let prefetcher = Prefetcher::with_depth(
        Arc::clone(&graph) as Arc<dyn GraphService>,
        CacheDepth::new(0, 0, 1, 1),
    );
    prefetcher.activate(channel.subscribe());

    eventually("turn lane completed", || inner.request_count(&id("T")) > 0).await;
    eventually("step lane failed", || graph.failures() > 0).await;

    assert!(prefetcher.is_active());
    assert!(inner.capture(&id("T")).unwrap().assets_cached());
    assert_eq!(inner.request_count(&id("X")), 0);
}

#[tokio::test]
async fn failing_asset_fetch_ends_only_its_lane() {
    let source = Arc::new(RecordingSource::failing_images(&["X"]));
    let graph = memory_graph_over(
        FixtureBuilder::new()
            .sequence("s", &["A", "X", "T"])
            .edge("A", "X", Direction::StepForward)
            .edge("A", "T", Direction::TurnRight)
            .build(),
        source.clone(),
    );

    let (prefetcher, _current) = start(&graph, "A", CacheDepth::new(0, 0, 1, 1)).await;

    eventually("turn neighbor cached", || {
        graph
            .capture(&id("T"))
            .is_some_and(|capture| capture.assets_cached())
    })
    .await;
    eventually("step neighbor requested", || graph.request_count(&id("X")) > 0).await;
    settle().await;

    assert!(prefetcher.is_active());
    assert!(!graph.capture(&id("X")).unwrap().assets_cached());
    let x_requests = source
        .image_requests()
        .iter()
        .filter(|url| url.ends_with("/X.png"))
        .count();
    assert_eq!(x_requests, 1);
}

#[tokio::test]
async fn similar_edges_are_never_prefetched() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s", &["A"])
            .sequence("t", &["F"])
            .sequence("u", &["S"])
            .edge("A", "S", Direction::Similar)
            .edge("A", "F", Direction::StepForward)
            .build(),
    );

    let (_prefetcher, _current) = start(&graph, "A", CacheDepth::new(4, 4, 4, 4)).await;

    eventually("step neighbor prefetched", || graph.request_count(&id("F")) > 0).await;
    settle().await;

    assert_eq!(graph.request_count(&id("S")), 0);
}

#[tokio::test]
async fn spatial_prefetch_waits_for_current_to_complete() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s", &["A", "B"])
            .edge("A", "B", Direction::StepForward)
            .build(),
    );

    let a = Arc::new(core_capture("A"));
    a.bind_cache(Arc::new(AssetCache::new(
        id("A"),
        Arc::new(RecordingSource::open()),
    )))
    .unwrap();
    a.cache_spatial_edges(vec![Edge::new(id("A"), id("B"), Direction::StepForward)])
        .unwrap();

    let channel = Replay::new(Some(Arc::clone(&a)));
    let prefetcher = Prefetcher::with_depth(
        Arc::clone(&graph) as Arc<dyn GraphService>,
        CacheDepth::new(0, 0, 1, 0),
    );
    prefetcher.activate(channel.subscribe());

    settle().await;
    assert_eq!(graph.request_count(&id("B")), 0);

    a.complete(Some(spatial("A", false))).unwrap();

    eventually("B prefetched once A is complete", || {
        graph.request_count(&id("B")) > 0
    })
    .await;
}

#[tokio::test]
async fn new_current_capture_restarts_prefetching() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s1", &["A", "B"])
            .sequence("s2", &["M", "N"])
            .build(),
    );

    let (_prefetcher, current) = start(&graph, "A", CacheDepth::new(1, 0, 0, 0)).await;
    eventually("B prefetched", || graph.request_count(&id("B")) > 0).await;

    let m = graph.cache_capture(&id("M")).await.unwrap();
    current.publish(Some(m));

    eventually("N prefetched", || graph.request_count(&id("N")) > 0).await;
}

#[tokio::test]
async fn depth_change_restarts_expansion() {
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &["A", "B", "C", "D"]).build());

    let (prefetcher, _current) = start(&graph, "A", CacheDepth::new(1, 0, 0, 0)).await;
    eventually("B prefetched", || graph.request_count(&id("B")) > 0).await;
    settle().await;
    assert_eq!(graph.request_count(&id("C")), 0);

    prefetcher.set_depth(CacheDepth::new(3, 0, 0, 0));

    eventually("D prefetched", || graph.request_count(&id("D")) > 0).await;
    assert_eq!(prefetched(&graph, &["A"]), vec!["B", "C", "D"]);
}

#[tokio::test]
async fn pipelines_wait_for_edges_to_be_cached() {
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &["A", "B"]).build());

    let a = graph.cache_capture(&id("A")).await.unwrap();
    a.reset_sequence_edges().unwrap();

    let channel = Replay::new(Some(Arc::clone(&a)));
    let prefetcher = Prefetcher::with_depth(
        Arc::clone(&graph) as Arc<dyn GraphService>,
        CacheDepth::new(1, 0, 0, 0),
    );
    prefetcher.activate(channel.subscribe());

    settle().await;
    assert_eq!(graph.request_count(&id("B")), 0);

    a.cache_sequence_edges(vec![Edge::new(id("A"), id("B"), Direction::Next)])
        .unwrap();

    eventually("B prefetched after edges arrive", || {
        graph.request_count(&id("B")) > 0
    })
    .await;
}

#[tokio::test]
async fn deactivation_stops_reacting_to_new_captures() {
    let graph = memory_graph(
        FixtureBuilder::new()
            .sequence("s1", &["A"])
            .sequence("s2", &["M", "N"])
            .build(),
    );

    let (prefetcher, current) = start(&graph, "A", CacheDepth::new(1, 0, 0, 0)).await;
    assert!(prefetcher.is_active());

    prefetcher.deactivate();
    assert!(!prefetcher.is_active());

    let m = graph.cache_capture(&id("M")).await.unwrap();
    current.publish(Some(m));
    settle().await;

    assert_eq!(graph.request_count(&id("N")), 0);
}

#[tokio::test]
async fn deactivation_lets_handed_off_fetches_finish() {
    let source = Arc::new(RecordingSource::gated());
    let graph = memory_graph_over(
        FixtureBuilder::new().sequence("s", &["A", "B"]).build(),
        source.clone(),
    );

    // Lets A through; B's image request then waits at the gate.
    source.release(1);
    let (prefetcher, _current) = start(&graph, "A", CacheDepth::new(1, 0, 0, 0)).await;
    eventually("B requested", || source.image_requests().len() == 2).await;
    assert!(graph.capture(&id("B")).unwrap().bitmap().is_none());

    prefetcher.deactivate();
    source.release(1);

    eventually("B bitmap stored after deactivation", || {
        graph
            .capture(&id("B"))
            .is_some_and(|capture| capture.bitmap().is_some())
    })
    .await;
    assert!(!prefetcher.is_active());
}

#[tokio::test]
async fn activation_is_idempotent() {
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &["A", "B"]).build());

    let (prefetcher, current) = start(&graph, "A", CacheDepth::new(1, 0, 0, 0)).await;
    prefetcher.activate(current.subscribe());

    eventually("B prefetched", || graph.request_count(&id("B")) > 0).await;
    settle().await;

    assert_eq!(graph.request_count(&id("B")), 1);
}

#[tokio::test]
async fn no_current_capture_means_no_requests() {
    let graph = memory_graph(FixtureBuilder::new().sequence("s", &["A", "B"]).build());
    let channel: Replay<Option<Arc<Capture>>> = Replay::new(None);
    let prefetcher = Prefetcher::new(Arc::clone(&graph) as Arc<dyn GraphService>);
    prefetcher.activate(channel.subscribe());

    settle().await;

    assert!(prefetcher.is_active());
    assert!(graph.requests().is_empty());
}
