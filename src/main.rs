// src/main.rs
use anyhow::Context;
use capture_prefetch::{
    AppError, AssetSource, Capture, CaptureId, CommandLineInput, GraphFixture, GraphService,
    HttpAssetClient, MemoryGraph, Prefetcher, Replay, SimulatedAssets, SimulationConfig,
};
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("prefetch_sim.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {T} - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {T} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Loads the graph, prefetches around the start capture and reports.
async fn run_simulation(config: &SimulationConfig) -> Result<(), AppError> {
    let fixture = GraphFixture::load(&config.fixture)?;
    let source = asset_source(config)?;
    let graph = Arc::new(MemoryGraph::with_image_size(
        fixture,
        source,
        config.image_size,
    )?);

    let start = graph.cache_capture(&config.start).await?;
    log::info!("Start capture {} is cached", start.id());

    let current: Replay<Option<Arc<Capture>>> = Replay::new(Some(Arc::clone(&start)));
    let prefetcher = Prefetcher::new(Arc::clone(&graph) as Arc<dyn GraphService>);
    prefetcher.set_depth(config.depth);
    prefetcher.activate(current.subscribe());

    tokio::time::sleep(config.settle).await;
    prefetcher.deactivate();

    report(&graph, &config.start);
    Ok(())
}

fn asset_source(config: &SimulationConfig) -> Result<Arc<dyn AssetSource>, AppError> {
    if config.live {
        log::info!("Fetching assets over HTTP");
        return Ok(Arc::new(HttpAssetClient::new()?));
    }

    log::info!(
        "Simulating assets ({}..={} ms, image failure {}, mesh failure {})",
        config.latency_ms.start(),
        config.latency_ms.end(),
        config.image_failure_rate,
        config.mesh_failure_rate
    );
    Ok(Arc::new(
        SimulatedAssets::new(config.latency_ms.clone())
            .with_image_failure_rate(config.image_failure_rate)
            .with_mesh_failure_rate(config.mesh_failure_rate),
    ))
}

/// Prints every requested capture with its cache state.
fn report(graph: &MemoryGraph, start: &CaptureId) {
    let requests = graph.requests();
    let prefetched = requests.iter().filter(|(id, _)| id != start).count();
    println!("Prefetched {} capture(s) around {}", prefetched, start);

    for (id, count) in &requests {
        let Some(capture) = graph.capture(id) else {
            println!("  ✗ {} (not in graph, requested {}x)", id, count);
            continue;
        };
        let marker = if capture.assets_cached() { "✓" } else { "…" };
        let mesh = capture
            .mesh()
            .map(|mesh| format!("{} triangles", mesh.triangle_count()))
            .unwrap_or_else(|| "no mesh".to_string());
        println!("  {} {} (requested {}x, {})", marker, id, count, mesh);

        if let Ok(cache) = capture.cache() {
            for warning in cache.warnings() {
                println!("      {}", warning);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).context("initializing logging")?;

    let config = SimulationConfig::resolve(cli).context("invalid arguments")?;

    run_simulation(&config)
        .await
        .with_context(|| format!("simulating from {}", config.fixture.display()))?;

    Ok(())
}
