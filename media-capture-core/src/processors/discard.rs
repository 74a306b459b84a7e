use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;
use crate::traits::frame_processor::FrameProcessor;

/// Accepts every frame and does nothing with it.
///
/// The minimal valid processor; useful as a baseline when only the
/// pipeline's delivery behavior matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardProcessor;

impl FrameProcessor for DiscardProcessor {
    fn process(&mut self, _frame: &FrameBuffer) -> Result<(), CaptureError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}
