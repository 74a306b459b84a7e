//! Hand-driven sources, providers and recording processors for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::models::device::DeviceHandle;
use crate::models::error::CaptureError;
use crate::models::frame::{AudioFormat, FrameBuffer, MediaKind, VideoFormat};
use crate::traits::capture_source::{CaptureSource, FrameCallback};
use crate::traits::device_provider::DeviceProvider;
use crate::traits::frame_processor::FrameProcessor;

pub fn video_frame(sequence: u64) -> FrameBuffer {
    let format = VideoFormat {
        width: 2,
        height: 2,
        ..Default::default()
    };
    FrameBuffer::video(
        sequence,
        Duration::from_millis(sequence * 33),
        format,
        vec![sequence as u8; format.frame_len()],
    )
}

pub fn audio_frame(sequence: u64) -> FrameBuffer {
    FrameBuffer::audio(
        sequence,
        Duration::from_millis(sequence * 10),
        AudioFormat::default(),
        &[0.5, -0.5, 0.25, -0.25],
    )
}

/// Records the sequence numbers it sees, optionally sleeping per frame.
#[derive(Clone, Default)]
pub struct RecordingProcessor {
    seen: Arc<Mutex<Vec<u64>>>,
    delay: Option<Duration>,
}

impl RecordingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            seen: Arc::default(),
            delay: Some(delay),
        }
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.seen.lock().clone()
    }
}

impl FrameProcessor for RecordingProcessor {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.seen.lock().push(frame.sequence());
        Ok(())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}

/// Announces each frame on `started`, then blocks until the gate sender is
/// dropped.
pub struct GatedProcessor {
    started: Sender<u64>,
    gate: Receiver<()>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl GatedProcessor {
    pub fn new() -> (Sender<()>, Receiver<u64>, Self) {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded(0);
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let processor = Self {
            started: started_tx,
            gate: gate_rx,
            seen: Arc::default(),
        };
        (gate_tx, started_rx, processor)
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<u64>>> {
        Arc::clone(&self.seen)
    }
}

impl FrameProcessor for GatedProcessor {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        let _ = self.started.send(frame.sequence());
        let _ = self.gate.recv();
        self.seen.lock().push(frame.sequence());
        Ok(())
    }
}

/// Test-side handle on a `ManualSource`: the test thread plays the producer.
#[derive(Clone, Default)]
pub struct SourceControl {
    deliver: Arc<Mutex<Option<FrameCallback>>>,
    fail_start: Arc<AtomicBool>,
}

impl SourceControl {
    /// Deliver a frame if the source is started. Returns whether it was delivered.
    pub fn push(&self, frame: FrameBuffer) -> bool {
        // Held across the call so `stop` waits for an in-progress delivery.
        let deliver = self.deliver.lock();
        match deliver.as_ref() {
            Some(callback) => {
                callback(frame);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deliver.lock().is_some()
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }
}

pub struct ManualSource {
    control: SourceControl,
}

impl ManualSource {
    pub fn new() -> (Self, SourceControl) {
        let control = SourceControl::default();
        (
            Self {
                control: control.clone(),
            },
            control,
        )
    }
}

impl CaptureSource for ManualSource {
    fn start(&mut self, deliver: FrameCallback) -> Result<(), CaptureError> {
        if self.control.fail_start.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::Device("manual source refused to start".into()));
        }
        *self.control.deliver.lock() = Some(deliver);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.control.deliver.lock().take();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.control.is_live()
    }
}

/// Provider with a set of default devices backed by `ManualSource`s.
#[derive(Default)]
pub struct ManualProvider {
    devices: Mutex<HashMap<MediaKind, DeviceHandle>>,
    unopenable: HashSet<String>,
    controls: Mutex<HashMap<String, SourceControl>>,
    opened: AtomicUsize,
}

impl ManualProvider {
    pub fn with_kinds(kinds: &[MediaKind]) -> Self {
        let devices = kinds
            .iter()
            .map(|kind| (*kind, device(*kind, &format!("{}-0", kind))))
            .collect();
        Self {
            devices: Mutex::new(devices),
            ..Default::default()
        }
    }

    pub fn unopenable(mut self, kind: MediaKind) -> Self {
        if let Some(device) = self.devices.get_mut().get(&kind) {
            self.unopenable.insert(device.id.clone());
        }
        self
    }

    /// Make `id` the default device of `kind`, as after a hot-plug.
    pub fn replace_default(&self, kind: MediaKind, id: &str) {
        self.devices.lock().insert(kind, device(kind, id));
    }

    /// Control for the most recently opened source of the current default `kind` device.
    pub fn control(&self, kind: MediaKind) -> Option<SourceControl> {
        let id = self.devices.lock().get(&kind)?.id.clone();
        self.controls.lock().get(&id).cloned()
    }

    /// Number of successful `open` calls.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl DeviceProvider for ManualProvider {
    fn default_device(&self, kind: MediaKind) -> Result<DeviceHandle, CaptureError> {
        self.devices
            .lock()
            .get(&kind)
            .cloned()
            .ok_or_else(|| CaptureError::NotFound(format!("default {} device", kind)))
    }

    fn open(&self, device: &DeviceHandle) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if self.unopenable.contains(&device.id) {
            return Err(CaptureError::Device(format!("cannot open {}", device)));
        }
        let (source, control) = ManualSource::new();
        self.controls.lock().insert(device.id.clone(), control);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(source))
    }
}

pub fn device(kind: MediaKind, id: &str) -> DeviceHandle {
    DeviceHandle::new(id, format!("Manual {}", kind), kind)
}
