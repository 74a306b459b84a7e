use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;
use crate::traits::frame_processor::FrameProcessor;

/// Audio level metering (RMS and peak, 0.0 to 1.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AudioLevels {
    /// RMS of the most recent frame.
    pub rms: f32,
    /// Peak of the most recent frame.
    pub peak: f32,
    /// Highest peak seen since the meter was created or reset.
    pub peak_hold: f32,
    pub frames: u64,
}

/// Measures the level of every audio frame. Video frames are rejected.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct LevelMeter {
    levels: Arc<Mutex<AudioLevels>>,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> AudioLevels {
        *self.levels.lock()
    }

    pub fn reset(&self) {
        *self.levels.lock() = AudioLevels::default();
    }

    /// RMS level of `samples`, clamped to 1.0.
    pub fn rms_level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt().min(1.0)
    }

    /// Peak absolute level of `samples`, clamped to 1.0.
    pub fn peak_level(samples: &[f32]) -> f32 {
        samples
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
            .min(1.0)
    }
}

impl FrameProcessor for LevelMeter {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        let samples = frame.audio_samples().ok_or_else(|| {
            CaptureError::Processor(format!("level meter got a {} frame", frame.kind()))
        })?;
        let rms = Self::rms_level(&samples);
        let peak = Self::peak_level(&samples);

        let mut levels = self.levels.lock();
        levels.rms = rms;
        levels.peak = peak;
        levels.peak_hold = levels.peak_hold.max(peak);
        levels.frames += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "level-meter"
    }
}
