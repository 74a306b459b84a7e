use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;
use crate::traits::frame_processor::FrameProcessor;

#[derive(Default)]
struct DigestState {
    hasher: Sha256,
    frames: u64,
    bytes: u64,
}

/// Running SHA-256 over the payloads of every frame it sees.
///
/// Clones share state, so keep one clone to read the digest while the other
/// is bound to a lane.
#[derive(Clone, Default)]
pub struct DigestProcessor {
    state: Arc<Mutex<DigestState>>,
}

impl DigestProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.state.lock().frames
    }

    pub fn bytes(&self) -> u64 {
        self.state.lock().bytes
    }

    /// Hex digest of everything hashed so far.
    pub fn digest_hex(&self) -> String {
        let digest = self.state.lock().hasher.clone().finalize();
        hex_encode(&digest)
    }
}

impl FrameProcessor for DigestProcessor {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        state.hasher.update(frame.payload());
        state.frames += 1;
        state.bytes += frame.payload().len() as u64;
        Ok(())
    }

    fn name(&self) -> &str {
        "digest"
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
