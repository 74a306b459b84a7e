//! Runs the synthetic camera and microphone through a full capture session.
//!
//! Usage: `capture-demo [config.json] [seconds]`
//!
//! Set `RUST_LOG=debug` to see lane and session transitions.

use std::thread;
use std::time::Duration;

use media_capture_core::{
    CaptureError, DigestProcessor, FrameBuffer, LevelMeter, MediaKind, PreviewSink, PreviewTap,
    SessionConfiguration, SessionOrchestrator,
};
use media_capture_synthetic::SyntheticDeviceProvider;

const DEFAULT_RUN_SECS: f64 = 2.0;

/// Stands in for an on-screen view: logs a line once per second of video.
struct LogPreview {
    every: u64,
}

impl PreviewSink for LogPreview {
    fn present(&mut self, frame: &FrameBuffer) {
        if frame.sequence() % self.every == 0 {
            log::info!(
                "preview: frame {} at {:.3}s ({} bytes)",
                frame.sequence(),
                frame.timestamp().as_secs_f64(),
                frame.payload().len()
            );
        }
    }
}

fn load_config(path: Option<&str>) -> Result<SessionConfiguration, CaptureError> {
    let Some(path) = path else {
        return Ok(SessionConfiguration::default());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| CaptureError::Configuration(format!("cannot read {}: {}", path, e)))?;
    SessionConfiguration::from_json(&json)
}

/// Run length in seconds; must be a finite, non-negative number.
fn parse_run_for(arg: Option<&str>) -> Result<Duration, CaptureError> {
    let Some(arg) = arg else {
        return Ok(Duration::from_secs_f64(DEFAULT_RUN_SECS));
    };
    match arg.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(CaptureError::Configuration(format!(
            "run length must be a finite number of seconds, got '{}'",
            arg
        ))),
    }
}

fn run() -> Result<(), CaptureError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    let run_for = parse_run_for(args.get(1).map(String::as_str))?;

    let mut orchestrator = SessionOrchestrator::new(SyntheticDeviceProvider::new(), config)?;
    let digest = DigestProcessor::new();
    let meter = LevelMeter::new();
    let video = PreviewTap::new(Box::new(digest.clone()), LogPreview { every: 30 });

    let report = orchestrator.start(Some(Box::new(video)), Some(Box::new(meter.clone())))?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => log::info!("start report:\n{}", json),
        Err(e) => log::warn!("cannot serialize start report: {}", e),
    }
    if !report.running {
        return Err(CaptureError::NoInput);
    }

    // Keep the lanes around so their final counters survive teardown.
    let lanes: Vec<_> = MediaKind::ALL
        .into_iter()
        .filter_map(|kind| orchestrator.lane(kind).cloned())
        .collect();

    thread::sleep(run_for);
    orchestrator.shutdown()?;

    for lane in &lanes {
        log::info!("{} lane: {:?}", lane.label(), lane.stats());
    }
    log::info!("session diagnostics: {:?}", orchestrator.session().diagnostics());
    log::info!(
        "video: {} frames, {} bytes, sha256 {}",
        digest.frames(),
        digest.bytes(),
        digest.digest_hex()
    );
    let levels = meter.levels();
    log::info!(
        "audio: {} frames, rms {:.3}, peak hold {:.3}",
        levels.frames,
        levels.rms,
        levels.peak_hold
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("capture demo failed: {}", e);
        std::process::exit(1);
    }
}
