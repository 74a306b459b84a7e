use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::dispatch::lane::DispatchLane;
use crate::dispatch::queue_pair::DispatchQueuePair;
use crate::models::config::SessionConfiguration;
use crate::models::device::DeviceHandle;
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::CaptureError;
use crate::models::frame::{FrameBuffer, MediaKind};
use crate::models::state::SessionState;
use crate::traits::capture_source::FrameCallback;
use crate::traits::session_delegate::SessionDelegate;

use super::input::CaptureInput;

/// Outputs a session accepts per media kind.
pub const OUTPUT_CAPACITY_PER_KIND: usize = 1;

/// Changes collected between `begin_configuration` and `commit_configuration`.
struct PendingConfiguration {
    resume: SessionState,
    added_inputs: Vec<CaptureInput>,
    removed_inputs: Vec<String>,
    added_outputs: Vec<Arc<DispatchLane>>,
    removed_outputs: Vec<MediaKind>,
}

impl PendingConfiguration {
    fn new(resume: SessionState) -> Self {
        Self {
            resume,
            added_inputs: Vec::new(),
            removed_inputs: Vec::new(),
            added_outputs: Vec::new(),
            removed_outputs: Vec::new(),
        }
    }
}

#[derive(Default)]
struct RouteCounters {
    video: AtomicU64,
    audio: AtomicU64,
    unrouted: AtomicU64,
}

impl RouteCounters {
    fn routed(&self, kind: MediaKind) {
        match kind {
            MediaKind::Video => self.video.fetch_add(1, Ordering::Relaxed),
            MediaKind::Audio => self.audio.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Stateful coordinator of device inputs, lane outputs and running state.
///
/// Inputs and outputs change only inside a `begin_configuration` /
/// `commit_configuration` bracket, which applies all-or-nothing. While
/// running, each input's source delivers frames on its own thread and the
/// session routes them by kind to the committed lane:
///
/// ```text
/// [video source] ─┐                ┌─▶ [capture.video lane] ─▶ processor
///                 ├─▶ routes (RwLock)
/// [audio source] ─┘                └─▶ [capture.audio lane] ─▶ processor
/// ```
pub struct CaptureSession {
    id: Uuid,
    config: SessionConfiguration,
    state: SessionState,
    inputs: Vec<CaptureInput>,
    routes: Arc<RwLock<DispatchQueuePair>>,
    admitting: Arc<AtomicBool>,
    counters: Arc<RouteCounters>,
    pending: Option<PendingConfiguration>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl CaptureSession {
    pub fn new(config: SessionConfiguration) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::Idle,
            inputs: Vec::new(),
            routes: Arc::new(RwLock::new(DispatchQueuePair::new())),
            admitting: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(RouteCounters::default()),
            pending: None,
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.config
    }

    /// Devices of the committed inputs, in attach order.
    pub fn inputs(&self) -> Vec<DeviceHandle> {
        self.inputs.iter().map(|input| input.device().clone()).collect()
    }

    pub fn has_input(&self, kind: MediaKind) -> bool {
        self.inputs.iter().any(|input| input.kind() == kind)
    }

    pub fn output(&self, kind: MediaKind) -> Option<Arc<DispatchLane>> {
        self.routes.read().lane(kind).cloned()
    }

    pub fn output_kinds(&self) -> Vec<MediaKind> {
        self.routes.read().kinds()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        SessionDiagnostics {
            video_frames_routed: self.counters.video.load(Ordering::Relaxed),
            audio_frames_routed: self.counters.audio.load(Ordering::Relaxed),
            unrouted_frames: self.counters.unrouted.load(Ordering::Relaxed),
        }
    }

    // --- Configuration transaction ---

    /// Open a configuration transaction. Valid from idle, running or stopped;
    /// commit or discard returns to that state.
    pub fn begin_configuration(&mut self) -> Result<(), CaptureError> {
        if !self.state.accepts_configuration() {
            return Err(CaptureError::invalid_state("begin_configuration", self.state));
        }
        self.pending = Some(PendingConfiguration::new(self.state));
        self.set_state(SessionState::Configuring);
        Ok(())
    }

    /// Whether another input of `device`'s kind fits, counting committed
    /// inputs plus the pending transaction.
    pub fn can_add_input(&self, device: &DeviceHandle) -> bool {
        self.input_count(device.kind) < self.config.max_inputs_per_kind
    }

    /// Whether another output of `kind` fits.
    pub fn can_add_output(&self, kind: MediaKind) -> bool {
        self.output_count(kind) < OUTPUT_CAPACITY_PER_KIND
    }

    pub fn add_input(&mut self, input: CaptureInput) -> Result<(), CaptureError> {
        self.require_configuring("add_input")?;
        if !self.can_add_input(input.device()) {
            return Err(CaptureError::Capacity(format!(
                "session cannot accept {}: {} input limit is {}",
                input.device(),
                input.kind(),
                self.config.max_inputs_per_kind
            )));
        }
        log::debug!("session {}: pending add of {}", self.id, input.device());
        if let Some(pending) = self.pending.as_mut() {
            pending.added_inputs.push(input);
        }
        Ok(())
    }

    pub fn remove_input(&mut self, device_id: &str) -> Result<(), CaptureError> {
        self.require_configuring("remove_input")?;
        let committed = self.inputs.iter().any(|input| input.device().id == device_id);
        let Some(pending) = self.pending.as_mut() else {
            return Err(CaptureError::invalid_state("remove_input", self.state));
        };

        if let Some(pos) = pending
            .added_inputs
            .iter()
            .position(|input| input.device().id == device_id)
        {
            pending.added_inputs.remove(pos);
            return Ok(());
        }
        if committed && !pending.removed_inputs.iter().any(|id| id == device_id) {
            pending.removed_inputs.push(device_id.to_string());
            return Ok(());
        }
        Err(CaptureError::NotFound(format!("input {}", device_id)))
    }

    pub fn add_output(&mut self, lane: Arc<DispatchLane>) -> Result<(), CaptureError> {
        self.require_configuring("add_output")?;
        if !self.can_add_output(lane.kind()) {
            return Err(CaptureError::Capacity(format!(
                "session already has a {} output",
                lane.kind()
            )));
        }
        log::debug!("session {}: pending add of output {}", self.id, lane.label());
        if let Some(pending) = self.pending.as_mut() {
            pending.added_outputs.push(lane);
        }
        Ok(())
    }

    pub fn remove_output(&mut self, kind: MediaKind) -> Result<(), CaptureError> {
        self.require_configuring("remove_output")?;
        let committed = self.routes.read().contains(kind);
        let Some(pending) = self.pending.as_mut() else {
            return Err(CaptureError::invalid_state("remove_output", self.state));
        };

        if let Some(pos) = pending.added_outputs.iter().position(|lane| lane.kind() == kind) {
            pending.added_outputs.remove(pos);
            return Ok(());
        }
        if committed && !pending.removed_outputs.contains(&kind) {
            pending.removed_outputs.push(kind);
            return Ok(());
        }
        Err(CaptureError::NotFound(format!("{} output", kind)))
    }

    /// Apply the pending transaction atomically.
    ///
    /// On failure nothing is applied, the transaction is discarded and the
    /// session returns to the state it was in before `begin_configuration`.
    pub fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        let Some(pending) = self.pending.take() else {
            return Err(CaptureError::invalid_state("commit_configuration", self.state));
        };
        let resume = pending.resume;

        if let Err(reason) = self.validate(&pending) {
            log::warn!("session {}: configuration rejected: {}", self.id, reason);
            self.set_state(resume);
            return Err(CaptureError::Configuration(reason));
        }

        let PendingConfiguration {
            mut added_inputs,
            removed_inputs,
            added_outputs,
            removed_outputs,
            ..
        } = pending;
        let running = resume.is_running();

        // Start new sources before touching anything, so a failure leaves
        // the committed configuration as it was.
        if running {
            let router = self.frame_router();
            for i in 0..added_inputs.len() {
                if let Err(e) = added_inputs[i].source.start(Arc::clone(&router)) {
                    for started in &mut added_inputs[..i] {
                        let _ = started.source.stop();
                    }
                    let reason = format!("failed to start {}: {}", added_inputs[i].device(), e);
                    log::warn!("session {}: {}", self.id, reason);
                    self.set_state(resume);
                    return Err(CaptureError::Configuration(reason));
                }
            }
        }

        let (detached, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inputs)
            .into_iter()
            .partition(|input| removed_inputs.contains(&input.device().id));
        self.inputs = kept;
        for mut input in detached {
            if running {
                if let Err(e) = input.source.stop() {
                    log::warn!("session {}: failed to stop {}: {}", self.id, input.device(), e);
                }
            }
            log::info!("session {}: detached {}", self.id, input.device());
        }
        for input in added_inputs {
            log::info!("session {}: attached {}", self.id, input.device());
            self.inputs.push(input);
        }

        let detached_lanes: Vec<Arc<DispatchLane>> = {
            let mut routes = self.routes.write();
            let detached = removed_outputs
                .iter()
                .filter_map(|kind| routes.remove(*kind))
                .collect();
            for lane in added_outputs {
                log::info!("session {}: attached {} output {}", self.id, lane.kind(), lane.label());
                routes.insert(lane);
            }
            detached
        };
        for lane in detached_lanes {
            lane.drain();
            log::info!("session {}: detached {} output {}", self.id, lane.kind(), lane.label());
        }

        self.set_state(resume);
        Ok(())
    }

    /// Abandon the pending transaction without applying anything.
    pub fn discard_configuration(&mut self) -> Result<(), CaptureError> {
        let Some(pending) = self.pending.take() else {
            return Err(CaptureError::invalid_state("discard_configuration", self.state));
        };
        self.set_state(pending.resume);
        Ok(())
    }

    // --- Lifecycle ---

    /// Start every input's source and begin routing frames to the lanes.
    pub fn start_running(&mut self) -> Result<(), CaptureError> {
        if !self.state.can_start() {
            return Err(CaptureError::invalid_state("start_running", self.state));
        }
        if self.inputs.is_empty() {
            log::warn!("session {}: cannot start, no inputs configured", self.id);
            return Err(CaptureError::NoInput);
        }
        if self.routes.read().is_empty() {
            log::warn!("session {}: starting with no outputs, frames will be discarded", self.id);
        }

        self.admitting.store(true, Ordering::Release);
        let router = self.frame_router();
        for i in 0..self.inputs.len() {
            if let Err(e) = self.inputs[i].source.start(Arc::clone(&router)) {
                self.admitting.store(false, Ordering::Release);
                for input in &mut self.inputs[..i] {
                    let _ = input.source.stop();
                }
                log::error!("session {}: failed to start {}: {}", self.id, self.inputs[i].device(), e);
                return Err(e);
            }
        }

        self.set_state(SessionState::Running);
        log::info!(
            "session {} running: {} input(s), outputs {:?}",
            self.id,
            self.inputs.len(),
            self.output_kinds()
        );
        Ok(())
    }

    /// Stop capture. Every frame admitted before the call is processed
    /// before this returns; nothing is admitted afterwards.
    ///
    /// Stopping an idle or already stopped session is a no-op.
    pub fn stop_running(&mut self) -> Result<(), CaptureError> {
        match self.state {
            SessionState::Running => {}
            SessionState::Idle | SessionState::Stopped => {
                log::debug!("session {}: stop_running while {}, nothing to do", self.id, self.state);
                return Ok(());
            }
            SessionState::Configuring => {
                return Err(CaptureError::invalid_state("stop_running", self.state));
            }
        }

        self.halt_sources();

        let lanes: Vec<Arc<DispatchLane>> = self.routes.read().lanes().cloned().collect();
        for lane in lanes {
            lane.drain();
        }

        self.set_state(SessionState::Stopped);
        log::info!("session {} stopped", self.id);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            log::debug!("session {}: {} -> {}", self.id, self.state, new_state);
        }
        self.state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(new_state);
        }
    }

    fn require_configuring(&self, operation: &'static str) -> Result<(), CaptureError> {
        if self.state.is_configuring() {
            Ok(())
        } else {
            Err(CaptureError::invalid_state(operation, self.state))
        }
    }

    fn input_count(&self, kind: MediaKind) -> usize {
        let removed: &[String] = self
            .pending
            .as_ref()
            .map(|p| p.removed_inputs.as_slice())
            .unwrap_or(&[]);
        let committed = self
            .inputs
            .iter()
            .filter(|input| input.kind() == kind && !removed.contains(&input.device().id))
            .count();
        let added = self
            .pending
            .as_ref()
            .map(|p| p.added_inputs.iter().filter(|input| input.kind() == kind).count())
            .unwrap_or(0);
        committed + added
    }

    fn output_count(&self, kind: MediaKind) -> usize {
        let removed = self
            .pending
            .as_ref()
            .map(|p| p.removed_outputs.contains(&kind))
            .unwrap_or(false);
        let committed = usize::from(self.routes.read().contains(kind) && !removed);
        let added = self
            .pending
            .as_ref()
            .map(|p| p.added_outputs.iter().filter(|lane| lane.kind() == kind).count())
            .unwrap_or(0);
        committed + added
    }

    /// Checks the configuration that committing `pending` would produce.
    fn validate(&self, pending: &PendingConfiguration) -> Result<(), String> {
        let resulting_inputs = self
            .inputs
            .iter()
            .filter(|input| !pending.removed_inputs.contains(&input.device().id))
            .chain(pending.added_inputs.iter());

        let mut ids = HashSet::new();
        let mut per_kind = [0usize; 2];
        for input in resulting_inputs {
            if !ids.insert(input.device().id.as_str()) {
                return Err(format!("device {} attached more than once", input.device()));
            }
            per_kind[input.kind() as usize] += 1;
        }
        for kind in MediaKind::ALL {
            if per_kind[kind as usize] > self.config.max_inputs_per_kind {
                return Err(format!(
                    "{} {} inputs exceed the limit of {}",
                    per_kind[kind as usize], kind, self.config.max_inputs_per_kind
                ));
            }
        }

        let routes = self.routes.read();
        for kind in MediaKind::ALL {
            let kept = usize::from(routes.contains(kind) && !pending.removed_outputs.contains(&kind));
            let added = pending.added_outputs.iter().filter(|lane| lane.kind() == kind).count();
            if kept + added > OUTPUT_CAPACITY_PER_KIND {
                return Err(format!("more than one {} output", kind));
            }
        }
        if let Some(lane) = pending.added_outputs.iter().find(|lane| lane.is_closed()) {
            return Err(format!("output {} is already shut down", lane.label()));
        }
        Ok(())
    }

    /// Close admission and stop every source, joining their producer threads.
    fn halt_sources(&mut self) {
        self.admitting.store(false, Ordering::Release);
        for input in &mut self.inputs {
            if let Err(e) = input.source.stop() {
                log::warn!("session {}: failed to stop {}: {}", self.id, input.device(), e);
            }
        }
    }

    /// Callback handed to every started source.
    fn frame_router(&self) -> FrameCallback {
        let routes = Arc::clone(&self.routes);
        let admitting = Arc::clone(&self.admitting);
        let counters = Arc::clone(&self.counters);

        Arc::new(move |frame: FrameBuffer| {
            if !admitting.load(Ordering::Acquire) {
                counters.unrouted.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let kind = frame.kind();
            // Clone the lane out so a blocked submit never holds the route lock.
            let lane = routes.read().lane(kind).cloned();
            let Some(lane) = lane else {
                counters.unrouted.fetch_add(1, Ordering::Relaxed);
                return;
            };
            match lane.submit(frame) {
                Ok(_) => counters.routed(kind),
                Err(e) => {
                    counters.unrouted.fetch_add(1, Ordering::Relaxed);
                    log::warn!("dropping {} frame: {}", kind, e);
                }
            }
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.admitting.load(Ordering::Acquire) {
            self.halt_sources();
        }
    }
}
