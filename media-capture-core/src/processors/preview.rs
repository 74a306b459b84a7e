use crate::models::error::CaptureError;
use crate::models::frame::FrameBuffer;
use crate::traits::frame_processor::FrameProcessor;
use crate::traits::preview_sink::PreviewSink;

/// Runs an inner processor, then hands the same frame to a preview sink.
///
/// The sink sees the frame even if the inner processor fails; the inner
/// processor's error is still reported to the lane.
pub struct PreviewTap<S: PreviewSink> {
    inner: Box<dyn FrameProcessor>,
    sink: S,
}

impl<S: PreviewSink> PreviewTap<S> {
    pub fn new(inner: Box<dyn FrameProcessor>, sink: S) -> Self {
        Self { inner, sink }
    }
}

impl<S: PreviewSink> FrameProcessor for PreviewTap<S> {
    fn process(&mut self, frame: &FrameBuffer) -> Result<(), CaptureError> {
        let result = self.inner.process(frame);
        self.sink.present(frame);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::test_support::{video_frame, RecordingProcessor};

    #[derive(Clone, Default)]
    struct CountingSink(Arc<Mutex<Vec<u64>>>);

    impl PreviewSink for CountingSink {
        fn present(&mut self, frame: &FrameBuffer) {
            self.0.lock().push(frame.sequence());
        }
    }

    #[test]
    fn sink_sees_frames_after_inner_processor() {
        let recorder = RecordingProcessor::new();
        let sink = CountingSink::default();
        let mut tap = PreviewTap::new(Box::new(recorder.clone()), sink.clone());

        tap.process(&video_frame(0)).unwrap();
        tap.process(&video_frame(1)).unwrap();

        assert_eq!(recorder.sequences(), vec![0, 1]);
        assert_eq!(*sink.0.lock(), vec![0, 1]);
        assert_eq!(tap.name(), "recorder");
    }

    #[test]
    fn sink_still_presents_when_inner_fails() {
        let failing = |_: &FrameBuffer| -> Result<(), CaptureError> {
            Err(CaptureError::Processor("nope".into()))
        };
        let sink = CountingSink::default();
        let mut tap = PreviewTap::new(Box::new(failing), sink.clone());

        assert!(tap.process(&video_frame(4)).is_err());
        assert_eq!(*sink.0.lock(), vec![4]);
    }
}
