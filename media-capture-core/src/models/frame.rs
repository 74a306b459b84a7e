use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kind of media carried by a device, frame or lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel layout of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Bgra8,
    Rgba8,
    /// Packed 4:2:2, two bytes per pixel.
    Yuyv,
    /// Planar luma followed by interleaved chroma at quarter resolution.
    Nv12,
}

impl PixelFormat {
    /// Bytes needed to hold one `width` x `height` image.
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Bgra8 | Self::Rgba8 => pixels * 4,
            Self::Yuyv => pixels * 2,
            Self::Nv12 => pixels + pixels / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl VideoFormat {
    pub fn frame_len(&self) -> usize {
        self.pixel_format.frame_len(self.width, self.height)
    }
}

impl Default for VideoFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Bgra8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// Format metadata attached to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrameFormat {
    Video(VideoFormat),
    Audio(AudioFormat),
}

impl FrameFormat {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }
}

/// One captured video image or audio chunk.
///
/// Immutable once produced. The buffer moves from the capture source into
/// exactly one dispatch lane; processors only ever see it by reference and
/// must clone the payload if they need it after `process` returns.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    sequence: u64,
    timestamp: Duration,
    format: FrameFormat,
    payload: Box<[u8]>,
}

impl FrameBuffer {
    pub fn new(sequence: u64, timestamp: Duration, format: FrameFormat, payload: Vec<u8>) -> Self {
        Self {
            sequence,
            timestamp,
            format,
            payload: payload.into_boxed_slice(),
        }
    }

    pub fn video(sequence: u64, timestamp: Duration, format: VideoFormat, payload: Vec<u8>) -> Self {
        Self::new(sequence, timestamp, FrameFormat::Video(format), payload)
    }

    /// Builds an audio frame from interleaved `f32` samples.
    pub fn audio(sequence: u64, timestamp: Duration, format: AudioFormat, samples: &[f32]) -> Self {
        let mut payload = Vec::with_capacity(samples.len() * 4);
        for sample in samples {
            payload.extend_from_slice(&sample.to_le_bytes());
        }
        Self::new(sequence, timestamp, FrameFormat::Audio(format), payload)
    }

    pub fn kind(&self) -> MediaKind {
        self.format.kind()
    }

    /// Per-source sequence number, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Monotonic time since the producing source started.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decodes the payload of an audio frame as interleaved `f32` samples.
    ///
    /// Returns `None` for video frames. Trailing bytes that do not form a
    /// whole sample are ignored.
    pub fn audio_samples(&self) -> Option<Vec<f32>> {
        if self.kind() != MediaKind::Audio {
            return None;
        }
        Some(
            self.payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    /// Number of audio frames (samples per channel), or 1 for video.
    pub fn frame_count(&self) -> usize {
        match self.format {
            FrameFormat::Video(_) => 1,
            FrameFormat::Audio(fmt) => {
                let channels = fmt.channels.max(1) as usize;
                self.payload.len() / 4 / channels
            }
        }
    }

    /// Playback duration of an audio frame. Video frames report zero.
    pub fn duration(&self) -> Duration {
        match self.format {
            FrameFormat::Video(_) => Duration::ZERO,
            FrameFormat::Audio(fmt) if fmt.sample_rate > 0 => {
                Duration::from_secs_f64(self.frame_count() as f64 / fmt.sample_rate as f64)
            }
            FrameFormat::Audio(_) => Duration::ZERO,
        }
    }
}
