// src/config.rs
use crate::constants::{
    DEFAULT_SEQUENCE_DEPTH, DEFAULT_SETTLE_MS, DEFAULT_SPHERICAL_DEPTH, DEFAULT_STEP_DEPTH,
    DEFAULT_TURN_DEPTH, SIMULATED_LATENCY_MAX_MS, SIMULATED_LATENCY_MIN_MS,
};
use crate::error::AppError;
use crate::prefetch::CacheDepth;
use crate::types::{CaptureId, ImageSize, ValidationError};
use clap::Parser;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Parsed command-line input for `prefetch-sim`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Graph fixture (JSON) describing sequences, captures and spatial edges
    pub fixture: PathBuf,

    /// Id of the capture to start from
    pub start: String,

    /// Hops to prefetch along the sequence in each direction (max 4)
    #[arg(long, default_value_t = DEFAULT_SEQUENCE_DEPTH)]
    pub sequence_depth: u8,

    /// Hops to prefetch through spherical edges (max 2)
    #[arg(long, default_value_t = DEFAULT_SPHERICAL_DEPTH)]
    pub spherical_depth: u8,

    /// Hops to prefetch through step edges (max 3)
    #[arg(long, default_value_t = DEFAULT_STEP_DEPTH)]
    pub step_depth: u8,

    /// Hops to prefetch through turn edges (max 1)
    #[arg(long, default_value_t = DEFAULT_TURN_DEPTH)]
    pub turn_depth: u8,

    /// Bitmap size to fetch: 256, 1024, 2048 or original
    #[arg(long, default_value = "1024")]
    pub image_size: String,

    /// Simulated latency per request in milliseconds, "MIN..MAX" or a single value
    #[arg(long)]
    pub latency_ms: Option<String>,

    /// Probability that a simulated image request fails
    #[arg(long, default_value_t = 0.0)]
    pub image_failure_rate: f64,

    /// Probability that a simulated mesh request fails
    #[arg(long, default_value_t = 0.0)]
    pub mesh_failure_rate: f64,

    /// How long to let prefetching run before reporting
    #[arg(long, default_value_t = DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,

    /// Fetch assets over HTTP from the fixture URLs instead of simulating them
    #[arg(long, default_value_t = false)]
    pub live: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub fixture: PathBuf,
    pub start: CaptureId,
    pub depth: CacheDepth,
    pub image_size: ImageSize,
    pub latency_ms: RangeInclusive<u64>,
    pub image_failure_rate: f64,
    pub mesh_failure_rate: f64,
    pub settle: Duration,
    pub live: bool,
    pub verbose: bool,
}

impl SimulationConfig {
    /// Validates CLI input into a runnable configuration.
    ///
    /// Depths above the lane maxima are accepted here; the prefetcher
    /// clamps them and warns.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let start = CaptureId::parse(&cli.start)?;
        let image_size = cli.image_size.parse::<ImageSize>()?;
        let latency_ms = match cli.latency_ms.as_deref() {
            Some(raw) => parse_latency(raw)?,
            None => SIMULATED_LATENCY_MIN_MS..=SIMULATED_LATENCY_MAX_MS,
        };

        Ok(SimulationConfig {
            fixture: cli.fixture,
            start,
            depth: CacheDepth::new(
                cli.sequence_depth,
                cli.spherical_depth,
                cli.step_depth,
                cli.turn_depth,
            ),
            image_size,
            latency_ms,
            image_failure_rate: probability(cli.image_failure_rate)?,
            mesh_failure_rate: probability(cli.mesh_failure_rate)?,
            settle: Duration::from_millis(cli.settle_ms),
            live: cli.live,
            verbose: cli.verbose,
        })
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixture: PathBuf::from("graph.json"),
            start: Self::example_capture_id(),
            depth: CacheDepth::default(),
            image_size: ImageSize::default(),
            latency_ms: SIMULATED_LATENCY_MIN_MS..=SIMULATED_LATENCY_MAX_MS,
            image_failure_rate: 0.0,
            mesh_failure_rate: 0.0,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            live: false,
            verbose: false,
        }
    }
}

impl SimulationConfig {
    fn example_capture_id() -> CaptureId {
        CaptureId::parse("start").expect("Example CaptureId should always be valid")
    }
}

fn probability(value: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfBounds {
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

/// Parses "MIN..MAX", "MIN-MAX" or a single value.
fn parse_latency(raw: &str) -> Result<RangeInclusive<u64>, ValidationError> {
    let invalid = || ValidationError::Malformed {
        field: "latency range",
        input: raw.to_string(),
    };
    let number = |part: &str| part.trim().parse::<u64>().map_err(|_| invalid());

    let (start, end) = match raw.split_once("..").or_else(|| raw.split_once('-')) {
        Some((start, end)) => (number(start)?, number(end)?),
        None => {
            let value = number(raw)?;
            (value, value)
        }
    };

    if start > end {
        return Err(ValidationError::InvalidRange { start, end });
    }
    Ok(start..=end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> CommandLineInput {
        let mut argv = vec!["prefetch-sim", "graph.json", "A"];
        argv.extend_from_slice(args);
        CommandLineInput::parse_from(argv)
    }

    #[test]
    fn defaults_match_default_config() {
        let config = SimulationConfig::resolve(cli(&[])).unwrap();
        let expected = SimulationConfig {
            start: CaptureId::parse("A").unwrap(),
            ..SimulationConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn depths_are_kept_unclamped() {
        let config = SimulationConfig::resolve(cli(&["--sequence-depth", "10"])).unwrap();
        assert_eq!(config.depth.sequence, 10);
        assert_eq!(config.depth.clamped().sequence, 4);
    }

    #[test]
    fn latency_forms() {
        assert_eq!(parse_latency("5..40").unwrap(), 5..=40);
        assert_eq!(parse_latency("10-20").unwrap(), 10..=20);
        assert_eq!(parse_latency("7").unwrap(), 7..=7);
        assert!(matches!(
            parse_latency("40..5"),
            Err(ValidationError::InvalidRange { start: 40, end: 5 })
        ));
        assert!(parse_latency("fast").is_err());
    }

    #[test]
    fn rejects_bad_failure_rate() {
        let err = SimulationConfig::resolve(cli(&["--mesh-failure-rate", "1.5"])).unwrap_err();
        assert!(matches!(
            err,
            AppError::ValidationError(ValidationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_bad_start_id() {
        let parsed = CommandLineInput::parse_from(["prefetch-sim", "graph.json", "not valid!"]);
        assert!(SimulationConfig::resolve(parsed).is_err());
    }

    #[test]
    fn parses_image_size() {
        let config = SimulationConfig::resolve(cli(&["--image-size", "2048"])).unwrap();
        assert_eq!(config.image_size, ImageSize::Size2048);
        assert!(SimulationConfig::resolve(cli(&["--image-size", "huge"])).is_err());
    }
}
