//! Moving-gradient test pattern video source.

use std::time::Duration;

use media_capture_core::{
    CaptureError, CaptureSource, FrameBuffer, FrameCallback, PixelFormat, VideoFormat,
};

use crate::producer::Producer;

/// Horizontal scroll of the gradient per frame, in pixels.
const SCROLL_PER_FRAME: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSpec {
    pub format: VideoFormat,
    pub frame_rate: f64,
}

impl VideoSpec {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1.0))
    }
}

impl Default for VideoSpec {
    fn default() -> Self {
        Self {
            format: VideoFormat::default(),
            frame_rate: 30.0,
        }
    }
}

/// Video source producing a scrolling gradient at a fixed frame rate.
pub struct TestPatternSource {
    spec: VideoSpec,
    producer: Producer,
}

impl TestPatternSource {
    pub fn new(spec: VideoSpec) -> Self {
        Self {
            spec,
            producer: Producer::default(),
        }
    }
}

impl CaptureSource for TestPatternSource {
    fn start(&mut self, deliver: FrameCallback) -> Result<(), CaptureError> {
        let spec = self.spec;
        let rate = spec.frame_rate.max(1.0);
        self.producer
            .start("synthetic-video-capture", spec.frame_interval(), move |seq| {
                let timestamp = Duration::from_secs_f64(seq as f64 / rate);
                let payload = render_pattern(&spec.format, seq);
                deliver(FrameBuffer::video(seq, timestamp, spec.format, payload));
            })?;
        log::info!(
            "test pattern started: {}x{} {:?} @ {} fps",
            spec.format.width,
            spec.format.height,
            spec.format.pixel_format,
            spec.frame_rate
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

/// Render frame `seq` of the pattern in `format`.
pub fn render_pattern(format: &VideoFormat, seq: u64) -> Vec<u8> {
    let width = format.width as usize;
    let height = format.height as usize;
    let shift = (seq as usize).wrapping_mul(SCROLL_PER_FRAME);
    let mut data = vec![0u8; format.frame_len()];

    let luma = |x: usize, y: usize| (x.wrapping_add(y).wrapping_add(shift) % 256) as u8;

    match format.pixel_format {
        PixelFormat::Bgra8 | PixelFormat::Rgba8 => {
            for y in 0..height {
                for x in 0..width {
                    let i = (y * width + x) * 4;
                    let r = luma(x, 0);
                    let g = luma(0, y);
                    let b = r ^ g;
                    let (first, third) = match format.pixel_format {
                        PixelFormat::Bgra8 => (b, r),
                        _ => (r, b),
                    };
                    data[i] = first;
                    data[i + 1] = g;
                    data[i + 2] = third;
                    data[i + 3] = 0xff;
                }
            }
        }
        PixelFormat::Yuyv => {
            for y in 0..height {
                for x in 0..width {
                    let i = (y * width + x) * 2;
                    data[i] = luma(x, y);
                    data[i + 1] = 0x80;
                }
            }
        }
        PixelFormat::Nv12 => {
            let plane = width * height;
            for y in 0..height {
                for x in 0..width {
                    data[y * width + x] = luma(x, y);
                }
            }
            data[plane..].fill(0x80);
        }
    }
    data
}
