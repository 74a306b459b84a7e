use std::sync::Arc;

use serde::Serialize;

use crate::dispatch::lane::DispatchLane;
use crate::dispatch::queue_pair::DispatchQueuePair;
use crate::models::config::SessionConfiguration;
use crate::models::diagnostics::LaneStats;
use crate::models::error::CaptureError;
use crate::models::frame::MediaKind;
use crate::traits::device_provider::DeviceProvider;
use crate::traits::frame_processor::FrameProcessor;
use crate::traits::session_delegate::SessionDelegate;

use super::capture_session::CaptureSession;
use super::input::CaptureInput;

/// Summary of a `SessionOrchestrator::start` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartReport {
    pub session_id: String,
    pub started_at: String,
    pub inputs: Vec<MediaKind>,
    pub outputs: Vec<MediaKind>,
    /// Steps that failed recoverably and were skipped.
    pub skipped: Vec<String>,
    pub running: bool,
}

/// Top-level driver: builds the capture session from a device provider's
/// default devices, binds processors to dispatch lanes, and runs it.
///
/// Sequence:
/// 1. default device per enabled kind → `begin` / `add_input` / `commit`
/// 2. one lane per attached kind → `begin` / `add_output` / `commit`
/// 3. `start_running`
///
/// Missing devices and capacity rejections are logged and skipped, so the
/// session comes up degraded (e.g. video-only) rather than failing.
pub struct SessionOrchestrator<P: DeviceProvider> {
    provider: P,
    config: SessionConfiguration,
    session: CaptureSession,
    lanes: DispatchQueuePair,
    delegate: Option<Arc<dyn SessionDelegate>>,
    skipped: Vec<String>,
}

impl<P: DeviceProvider> SessionOrchestrator<P> {
    pub fn new(provider: P, config: SessionConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::Configuration)?;
        Ok(Self {
            provider,
            session: CaptureSession::new(config.clone()),
            config,
            lanes: DispatchQueuePair::new(),
            delegate: None,
            skipped: Vec::new(),
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.session.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn lane(&self, kind: MediaKind) -> Option<&Arc<DispatchLane>> {
        self.lanes.lane(kind)
    }

    pub fn lane_stats(&self, kind: MediaKind) -> Option<LaneStats> {
        self.lanes.lane(kind).map(|lane| lane.stats())
    }

    /// Attach the provider's default device for every enabled kind in one
    /// configuration bracket. Returns the kinds that were attached.
    pub fn attach_default_inputs(&mut self) -> Result<Vec<MediaKind>, CaptureError> {
        let kinds = self.enabled_kinds();
        self.session.begin_configuration()?;

        let mut attached = Vec::new();
        for kind in kinds {
            match self.attach_default_input(kind) {
                Ok(()) => attached.push(kind),
                Err(e) if e.is_recoverable() => {
                    self.skip(&format!("{} input", kind), e);
                }
                Err(e) => {
                    self.session.discard_configuration()?;
                    return Err(e);
                }
            }
        }

        match self.session.commit_configuration() {
            Ok(()) => Ok(attached),
            Err(e @ CaptureError::Configuration(_)) => {
                self.skip("input configuration", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Bind each given processor to a new lane and attach the lanes as
    /// outputs in one configuration bracket. Returns the kinds attached.
    pub fn attach_processors(
        &mut self,
        video: Option<Box<dyn FrameProcessor>>,
        audio: Option<Box<dyn FrameProcessor>>,
    ) -> Result<Vec<MediaKind>, CaptureError> {
        self.session.begin_configuration()?;

        let mut pending = Vec::new();
        for (kind, processor) in [(MediaKind::Video, video), (MediaKind::Audio, audio)] {
            let Some(processor) = processor else {
                continue;
            };
            let lane = match self.spawn_lane(kind, processor) {
                Ok(lane) => lane,
                Err(e) => {
                    self.skip(&format!("{} lane", kind), e);
                    continue;
                }
            };
            match self.session.add_output(Arc::clone(&lane)) {
                Ok(()) => pending.push(lane),
                Err(e) if e.is_recoverable() => {
                    lane.shutdown();
                    self.skip(&format!("{} output", kind), e);
                }
                Err(e) => {
                    lane.shutdown();
                    for lane in pending {
                        lane.shutdown();
                    }
                    self.session.discard_configuration()?;
                    return Err(e);
                }
            }
        }

        match self.session.commit_configuration() {
            Ok(()) => {
                let kinds = pending.iter().map(|lane| lane.kind()).collect();
                for lane in pending {
                    if let Some(previous) = self.lanes.insert(lane) {
                        previous.shutdown();
                    }
                }
                Ok(kinds)
            }
            Err(e) => {
                for lane in pending {
                    lane.shutdown();
                }
                if matches!(e, CaptureError::Configuration(_)) {
                    self.skip("output configuration", e);
                    Ok(Vec::new())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Full bring-up: inputs, outputs for the kinds that got an input, then
    /// start. Processors for kinds without an input are dropped.
    pub fn start(
        &mut self,
        video: Option<Box<dyn FrameProcessor>>,
        audio: Option<Box<dyn FrameProcessor>>,
    ) -> Result<StartReport, CaptureError> {
        self.skipped.clear();
        let started_at = chrono::Utc::now().to_rfc3339();

        self.attach_default_inputs()?;
        let video = self.keep_if_attached(MediaKind::Video, video);
        let audio = self.keep_if_attached(MediaKind::Audio, audio);
        self.attach_processors(video, audio)?;

        let running = match self.session.start_running() {
            Ok(()) => true,
            Err(CaptureError::NoInput) => {
                self.skip("capture", CaptureError::NoInput);
                false
            }
            Err(e) => return Err(e),
        };

        Ok(StartReport {
            session_id: self.session.id().to_string(),
            started_at,
            inputs: self.session.inputs().into_iter().map(|device| device.kind).collect(),
            outputs: self.session.output_kinds(),
            skipped: self.skipped.clone(),
            running,
        })
    }

    /// Swap the processor serving `kind` without stopping the session.
    /// The replaced lane is drained and shut down; the other lane is untouched.
    pub fn replace_processor(
        &mut self,
        kind: MediaKind,
        processor: Box<dyn FrameProcessor>,
    ) -> Result<(), CaptureError> {
        let lane = self.spawn_lane(kind, processor)?;

        self.session.begin_configuration()?;
        let staged = if self.session.output(kind).is_some() {
            self.session.remove_output(kind)
        } else {
            Ok(())
        }
        .and_then(|()| self.session.add_output(Arc::clone(&lane)));

        if let Err(e) = staged {
            lane.shutdown();
            self.session.discard_configuration()?;
            return Err(e);
        }
        if let Err(e) = self.session.commit_configuration() {
            lane.shutdown();
            return Err(e);
        }

        if let Some(previous) = self.lanes.insert(lane) {
            previous.shutdown();
        }
        log::info!("replaced {} processor", kind);
        Ok(())
    }

    /// Stop the session, detach its outputs, then tear down every lane.
    /// Safe to call repeatedly; a later `start` binds fresh lanes.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        self.session.stop_running()?;

        let attached = self.session.output_kinds();
        if !attached.is_empty() {
            self.session.begin_configuration()?;
            for kind in attached {
                if let Err(e) = self.session.remove_output(kind) {
                    self.session.discard_configuration()?;
                    return Err(e);
                }
            }
            self.session.commit_configuration()?;
        }

        self.lanes.shutdown_all();
        Ok(())
    }

    // --- Internal helpers ---

    fn enabled_kinds(&self) -> Vec<MediaKind> {
        let mut kinds = Vec::new();
        if self.config.enable_video {
            kinds.push(MediaKind::Video);
        }
        if self.config.enable_audio {
            kinds.push(MediaKind::Audio);
        }
        kinds
    }

    /// Open the provider's default `kind` device and stage it as an input.
    /// A device the session already holds counts as attached.
    fn attach_default_input(&mut self, kind: MediaKind) -> Result<(), CaptureError> {
        let device = self.provider.default_device(kind)?;
        if self.session.inputs().iter().any(|held| held.id == device.id) {
            log::debug!("{} already attached", device);
            return Ok(());
        }
        if !self.session.can_add_input(&device) {
            return Err(CaptureError::Capacity(format!(
                "session cannot accept {}: {} input limit is {}",
                device, kind, self.config.max_inputs_per_kind
            )));
        }
        let input = CaptureInput::open(&self.provider, device)?;
        self.session.add_input(input)
    }

    fn spawn_lane(
        &self,
        kind: MediaKind,
        processor: Box<dyn FrameProcessor>,
    ) -> Result<Arc<DispatchLane>, CaptureError> {
        DispatchLane::spawn(
            format!("capture.{}", kind),
            kind,
            processor,
            self.config.lane_capacity,
            self.config.backpressure,
        )
    }

    fn keep_if_attached(
        &self,
        kind: MediaKind,
        processor: Option<Box<dyn FrameProcessor>>,
    ) -> Option<Box<dyn FrameProcessor>> {
        let processor = processor?;
        if self.session.has_input(kind) {
            Some(processor)
        } else {
            log::info!("no {} input attached, not creating a {} lane", kind, kind);
            None
        }
    }

    /// Log a recoverable failure, tell the delegate, and carry on.
    fn skip(&mut self, step: &str, error: CaptureError) {
        log::warn!("{} unavailable, continuing without it: {}", step, error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        self.skipped.push(format!("{}: {}", step, error));
    }
}

impl<P: DeviceProvider> Drop for SessionOrchestrator<P> {
    fn drop(&mut self) {
        if self.session.state().is_configuring() {
            let _ = self.session.discard_configuration();
        }
        if let Err(e) = self.shutdown() {
            log::warn!("orchestrator shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::models::state::SessionState;
    use crate::test_support::{audio_frame, video_frame, ManualProvider, RecordingProcessor};

    #[derive(Default)]
    struct ErrorLog(Mutex<Vec<CaptureError>>);

    impl SessionDelegate for ErrorLog {
        fn on_state_changed(&self, _state: SessionState) {}

        fn on_error(&self, error: &CaptureError) {
            self.0.lock().push(error.clone());
        }
    }

    fn orchestrator(kinds: &[MediaKind]) -> SessionOrchestrator<ManualProvider> {
        SessionOrchestrator::new(ManualProvider::with_kinds(kinds), SessionConfiguration::default())
            .unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = SessionConfiguration {
            lane_capacity: 0,
            ..Default::default()
        };
        let result = SessionOrchestrator::new(ManualProvider::default(), config);
        assert!(matches!(result, Err(CaptureError::Configuration(_))));
    }

    #[test]
    fn video_only_when_audio_device_missing() {
        let errors = Arc::new(ErrorLog::default());
        let mut orch = orchestrator(&[MediaKind::Video]);
        orch.set_delegate(errors.clone());
        let video = RecordingProcessor::new();
        let audio = RecordingProcessor::new();

        let report = orch
            .start(Some(Box::new(video.clone())), Some(Box::new(audio.clone())))
            .unwrap();

        assert!(report.running);
        assert_eq!(report.inputs, vec![MediaKind::Video]);
        assert_eq!(report.outputs, vec![MediaKind::Video]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].starts_with("audio input"));
        assert_eq!(orch.session().state(), SessionState::Running);
        assert!(orch.lane(MediaKind::Audio).is_none());
        assert!(matches!(errors.0.lock()[0], CaptureError::NotFound(_)));

        let camera = orch.provider().control(MediaKind::Video).unwrap();
        camera.push(video_frame(0));
        camera.push(video_frame(1));
        orch.shutdown().unwrap();

        assert_eq!(video.sequences(), vec![0, 1]);
        assert!(audio.sequences().is_empty());
    }

    #[test]
    fn no_devices_reports_not_running() {
        let mut orch = orchestrator(&[]);

        let report = orch
            .start(Some(Box::new(RecordingProcessor::new())), None)
            .unwrap();

        assert!(!report.running);
        assert!(report.inputs.is_empty());
        assert_eq!(report.skipped.len(), 3); // video, audio, capture
        assert_eq!(orch.session().state(), SessionState::Idle);
    }

    #[test]
    fn unopenable_device_is_skipped() {
        let provider = ManualProvider::with_kinds(&[MediaKind::Video, MediaKind::Audio])
            .unopenable(MediaKind::Audio);
        let mut orch = SessionOrchestrator::new(provider, SessionConfiguration::default()).unwrap();

        let report = orch.start(Some(Box::new(RecordingProcessor::new())), None).unwrap();

        assert!(report.running);
        assert_eq!(report.inputs, vec![MediaKind::Video]);
        assert!(report.skipped[0].contains("cannot open"));
        orch.shutdown().unwrap();
    }

    #[test]
    fn disabled_kinds_are_not_requested() {
        let config = SessionConfiguration {
            enable_audio: false,
            ..Default::default()
        };
        let provider = ManualProvider::with_kinds(&[MediaKind::Video, MediaKind::Audio]);
        let mut orch = SessionOrchestrator::new(provider, config).unwrap();

        let report = orch.start(None, None).unwrap();

        assert_eq!(report.inputs, vec![MediaKind::Video]);
        assert!(report.skipped.is_empty());
        orch.shutdown().unwrap();
    }

    #[test]
    fn full_pipeline_delivers_both_kinds() {
        let mut orch = orchestrator(&[MediaKind::Video, MediaKind::Audio]);
        let video = RecordingProcessor::new();
        let audio = RecordingProcessor::with_delay(Duration::from_millis(1));

        let report = orch
            .start(Some(Box::new(video.clone())), Some(Box::new(audio.clone())))
            .unwrap();
        assert_eq!(report.outputs, vec![MediaKind::Video, MediaKind::Audio]);

        let camera = orch.provider().control(MediaKind::Video).unwrap();
        let mic = orch.provider().control(MediaKind::Audio).unwrap();
        for seq in 0..5 {
            camera.push(video_frame(seq));
            mic.push(audio_frame(seq));
        }
        orch.shutdown().unwrap();
        orch.shutdown().unwrap();

        assert_eq!(video.sequences(), (0..5).collect::<Vec<_>>());
        assert_eq!(audio.sequences(), (0..5).collect::<Vec<_>>());
        assert_eq!(orch.session().state(), SessionState::Stopped);
        assert!(orch.lane(MediaKind::Video).is_none());
    }

    #[test]
    fn second_start_is_invalid_state() {
        let mut orch = orchestrator(&[MediaKind::Video]);
        orch.start(None, None).unwrap();

        let err = orch.start(None, None).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState { operation: "start_running", .. }));
        orch.shutdown().unwrap();
    }

    #[test]
    fn restart_after_shutdown_binds_fresh_lanes() {
        let mut orch = orchestrator(&[MediaKind::Video]);
        let first = RecordingProcessor::new();
        let second = RecordingProcessor::new();

        orch.start(Some(Box::new(first.clone())), None).unwrap();
        let camera = orch.provider().control(MediaKind::Video).unwrap();
        camera.push(video_frame(0));
        orch.shutdown().unwrap();

        assert!(orch.session().output(MediaKind::Video).is_none());
        assert_eq!(orch.session().state(), SessionState::Stopped);

        let report = orch.start(Some(Box::new(second.clone())), None).unwrap();
        assert!(report.running);
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);
        assert_eq!(report.inputs, vec![MediaKind::Video]);
        assert_eq!(report.outputs, vec![MediaKind::Video]);
        assert_eq!(orch.provider().opened(), 1);

        assert!(camera.push(video_frame(1)));
        orch.shutdown().unwrap();

        assert_eq!(first.sequences(), vec![0]);
        assert_eq!(second.sequences(), vec![1]);
        assert_eq!(orch.session().diagnostics().unrouted_frames, 0);
    }

    #[test]
    fn over_capacity_default_device_is_never_opened() {
        let mut orch = orchestrator(&[MediaKind::Video]);
        orch.start(None, None).unwrap();
        assert_eq!(orch.provider().opened(), 1);

        orch.provider().replace_default(MediaKind::Video, "video-1");
        let attached = orch.attach_default_inputs().unwrap();

        assert!(attached.is_empty());
        assert_eq!(orch.provider().opened(), 1);
        assert_eq!(orch.session().inputs().len(), 1);
        assert_eq!(orch.session().state(), SessionState::Running);
        orch.shutdown().unwrap();
    }

    #[test]
    fn replace_processor_while_running() {
        let mut orch = orchestrator(&[MediaKind::Video]);
        let first = RecordingProcessor::new();
        let second = RecordingProcessor::new();
        orch.start(Some(Box::new(first.clone())), None).unwrap();
        let camera = orch.provider().control(MediaKind::Video).unwrap();

        camera.push(video_frame(0));
        orch.replace_processor(MediaKind::Video, Box::new(second.clone()))
            .unwrap();
        camera.push(video_frame(1));
        orch.shutdown().unwrap();

        assert_eq!(first.sequences(), vec![0]);
        assert_eq!(second.sequences(), vec![1]);
        assert_eq!(orch.session().state(), SessionState::Stopped);
    }

    #[test]
    fn lane_stats_are_exposed() {
        let mut orch = orchestrator(&[MediaKind::Audio]);
        orch.start(None, Some(Box::new(RecordingProcessor::new()))).unwrap();
        let mic = orch.provider().control(MediaKind::Audio).unwrap();
        mic.push(audio_frame(0));
        orch.session().output(MediaKind::Audio).unwrap().drain();

        let stats = orch.lane_stats(MediaKind::Audio).unwrap();
        assert_eq!(stats.admitted, 1);
        assert_eq!(stats.processed, 1);
        assert!(orch.lane_stats(MediaKind::Video).is_none());
    }
}
