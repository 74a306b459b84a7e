use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;

/// Callback invoked by a capture source for each produced frame.
///
/// Runs on the source's own producer thread; the session's callback only
/// routes the frame into a lane and never waits on processor work unless the
/// lane is configured with the block-producer policy.
pub type FrameCallback = Arc<dyn Fn(FrameBuffer) + Send + Sync + 'static>;

/// A live stream of frames from one opened device.
///
/// Implemented by platform backends (and by the synthetic backend used for
/// demos and tests).
pub trait CaptureSource: Send {
    /// Start producing frames, delivering each one via `deliver`.
    fn start(&mut self, deliver: FrameCallback) -> Result<(), CaptureError>;

    /// Stop producing. Once this returns, `deliver` is never called again.
    fn stop(&mut self) -> Result<(), CaptureError>;

    fn is_running(&self) -> bool;
}
