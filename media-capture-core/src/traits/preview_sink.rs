use crate::models::frame::FrameBuffer;

/// External on-screen renderer.
///
/// The pipeline hands frames to the sink; drawing them is the embedding
/// application's business.
pub trait PreviewSink: Send {
    fn present(&mut self, frame: &FrameBuffer);
}
