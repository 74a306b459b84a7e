//! Device provider exposing one synthetic camera and one synthetic microphone.

use media_capture_core::{CaptureError, CaptureSource, DeviceHandle, DeviceProvider, MediaKind};

use crate::pattern::{TestPatternSource, VideoSpec};
use crate::tone::{ToneSource, ToneSpec};

pub const VIDEO_DEVICE_ID: &str = "synthetic-video-0";
pub const AUDIO_DEVICE_ID: &str = "synthetic-audio-0";

/// Provider whose default devices are generated in software.
///
/// Each kind can be removed to simulate a machine without a camera or
/// microphone.
#[derive(Debug, Clone)]
pub struct SyntheticDeviceProvider {
    video: Option<VideoSpec>,
    audio: Option<ToneSpec>,
}

impl SyntheticDeviceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, spec: VideoSpec) -> Self {
        self.video = Some(spec);
        self
    }

    pub fn without_video(mut self) -> Self {
        self.video = None;
        self
    }

    pub fn with_audio(mut self, spec: ToneSpec) -> Self {
        self.audio = Some(spec);
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.audio = None;
        self
    }
}

impl Default for SyntheticDeviceProvider {
    fn default() -> Self {
        Self {
            video: Some(VideoSpec::default()),
            audio: Some(ToneSpec::default()),
        }
    }
}

impl DeviceProvider for SyntheticDeviceProvider {
    fn default_device(&self, kind: MediaKind) -> Result<DeviceHandle, CaptureError> {
        match kind {
            MediaKind::Video if self.video.is_some() => Ok(DeviceHandle::new(
                VIDEO_DEVICE_ID,
                "Synthetic Test Pattern",
                MediaKind::Video,
            )),
            MediaKind::Audio if self.audio.is_some() => Ok(DeviceHandle::new(
                AUDIO_DEVICE_ID,
                "Synthetic Tone",
                MediaKind::Audio,
            )),
            _ => Err(CaptureError::NotFound(format!("no synthetic {} device", kind))),
        }
    }

    fn open(&self, device: &DeviceHandle) -> Result<Box<dyn CaptureSource>, CaptureError> {
        match (device.kind, device.id.as_str()) {
            (MediaKind::Video, VIDEO_DEVICE_ID) => match self.video {
                Some(spec) => Ok(Box::new(TestPatternSource::new(spec))),
                None => Err(CaptureError::NotFound(format!("{} is gone", device))),
            },
            (MediaKind::Audio, AUDIO_DEVICE_ID) => match self.audio {
                Some(spec) => Ok(Box::new(ToneSource::new(spec))),
                None => Err(CaptureError::NotFound(format!("{} is gone", device))),
            },
            _ => Err(CaptureError::NotFound(format!("unknown device {}", device))),
        }
    }
}
