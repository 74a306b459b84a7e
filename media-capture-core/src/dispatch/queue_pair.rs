use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::{FrameBuffer, MediaKind};

use super::lane::{Admission, DispatchLane};

/// The video lane and the audio lane, each optional.
///
/// The two lanes are fully independent: each has its own queue and
/// delivery thread, and no ordering is implied between them.
#[derive(Debug, Default, Clone)]
pub struct DispatchQueuePair {
    video: Option<Arc<DispatchLane>>,
    audio: Option<Arc<DispatchLane>>,
}

impl DispatchQueuePair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lane(&self, kind: MediaKind) -> Option<&Arc<DispatchLane>> {
        self.slot(kind).as_ref()
    }

    pub fn contains(&self, kind: MediaKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Install `lane` in the slot for its kind, returning the lane it replaced.
    pub fn insert(&mut self, lane: Arc<DispatchLane>) -> Option<Arc<DispatchLane>> {
        self.slot_mut(lane.kind()).replace(lane)
    }

    pub fn remove(&mut self, kind: MediaKind) -> Option<Arc<DispatchLane>> {
        self.slot_mut(kind).take()
    }

    /// Kinds that currently have a lane, video first.
    pub fn kinds(&self) -> Vec<MediaKind> {
        MediaKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    pub fn lanes(&self) -> impl Iterator<Item = &Arc<DispatchLane>> {
        self.video.iter().chain(self.audio.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// Route a frame to the lane matching its kind.
    ///
    /// Returns `NotFound` (with the frame released) when no lane serves the kind.
    pub fn dispatch(&self, frame: FrameBuffer) -> Result<Admission, CaptureError> {
        match self.lane(frame.kind()) {
            Some(lane) => lane.submit(frame),
            None => Err(CaptureError::NotFound(format!("{} lane", frame.kind()))),
        }
    }

    /// Wait until both lanes have processed everything admitted so far.
    pub fn drain_all(&self) {
        for lane in self.lanes() {
            lane.drain();
        }
    }

    /// Shut down and detach both lanes.
    pub fn shutdown_all(&mut self) {
        for kind in MediaKind::ALL {
            if let Some(lane) = self.remove(kind) {
                lane.shutdown();
            }
        }
    }

    fn slot(&self, kind: MediaKind) -> &Option<Arc<DispatchLane>> {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    fn slot_mut(&mut self, kind: MediaKind) -> &mut Option<Arc<DispatchLane>> {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
        }
    }
}
