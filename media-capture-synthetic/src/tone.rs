//! Sine tone audio source.

use std::f64::consts::TAU;
use std::time::Duration;

use media_capture_core::{AudioFormat, CaptureError, CaptureSource, FrameBuffer, FrameCallback};

use crate::producer::Producer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub format: AudioFormat,
    pub frequency_hz: f64,
    /// Peak amplitude, 0.0 to 1.0.
    pub amplitude: f32,
    /// Duration of audio carried by each frame.
    pub chunk: Duration,
}

impl ToneSpec {
    /// Audio frames (samples per channel) in one chunk.
    pub fn frames_per_chunk(&self) -> usize {
        ((self.format.sample_rate as f64 * self.chunk.as_secs_f64()).round() as usize).max(1)
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            frequency_hz: 440.0,
            amplitude: 0.5,
            chunk: Duration::from_millis(10),
        }
    }
}

/// Audio source producing a continuous sine tone in fixed-size chunks.
pub struct ToneSource {
    spec: ToneSpec,
    producer: Producer,
}

impl ToneSource {
    pub fn new(spec: ToneSpec) -> Self {
        Self {
            spec,
            producer: Producer::default(),
        }
    }
}

impl CaptureSource for ToneSource {
    fn start(&mut self, deliver: FrameCallback) -> Result<(), CaptureError> {
        let spec = self.spec;
        if spec.format.sample_rate == 0 || spec.format.channels == 0 {
            return Err(CaptureError::Device(format!(
                "unsupported audio format: {} Hz, {} channels",
                spec.format.sample_rate, spec.format.channels
            )));
        }
        let frames = spec.frames_per_chunk();
        let rate = spec.format.sample_rate as f64;
        let interval = Duration::from_secs_f64(frames as f64 / rate);

        self.producer.start("synthetic-audio-capture", interval, move |seq| {
            let start_frame = seq * frames as u64;
            let samples = render_tone(&spec, start_frame, frames);
            let timestamp = Duration::from_secs_f64(start_frame as f64 / rate);
            deliver(FrameBuffer::audio(seq, timestamp, spec.format, &samples));
        })?;
        log::info!(
            "tone started: {} Hz at {} Hz x {} ch, {} frames per chunk",
            spec.frequency_hz,
            spec.format.sample_rate,
            spec.format.channels,
            frames
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.producer.stop();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.producer.is_running()
    }
}

/// Interleaved samples for `frames` audio frames starting at `start_frame`.
/// Every channel carries the same signal; phase is continuous across chunks.
pub fn render_tone(spec: &ToneSpec, start_frame: u64, frames: usize) -> Vec<f32> {
    let channels = spec.format.channels.max(1) as usize;
    let rate = spec.format.sample_rate.max(1) as f64;
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = (start_frame + i as u64) as f64 / rate;
        let value = spec.amplitude * (TAU * spec.frequency_hz * t).sin() as f32;
        for _ in 0..channels {
            samples.push(value);
        }
    }
    samples
}
