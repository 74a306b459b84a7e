use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;

/// Caller-supplied consumer bound to a dispatch lane.
///
/// Invoked once for every frame admitted to the lane, in arrival order, on
/// the lane's delivery thread. The frame is only borrowed for the duration
/// of the call; clone the payload to keep it.
///
/// Returning an error (or panicking) does not stop the lane: the failure is
/// logged, counted, and published on the lane's fault channel.
pub trait FrameProcessor: Send {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "processor"
    }
}

impl<F> FrameProcessor for F
where
    F: FnMut(&FrameBuffer) -> Result<(), CaptureError> + Send,
{
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        self(frame)
    }
}
