//! # media-capture-core
//!
//! Platform-agnostic audio/video capture pipeline.
//!
//! A `CaptureSession` owns device inputs and one output lane per media kind.
//! Each `DispatchLane` delivers frames to a caller-supplied `FrameProcessor`
//! on its own thread. Platform backends implement `DeviceProvider` and
//! `CaptureSource`; `SessionOrchestrator` wires everything together.
//!
//! ## Architecture
//!
//! ```text
//! media-capture-core (this crate)
//! ├── traits/      ← FrameProcessor, DeviceProvider, CaptureSource, PreviewSink, SessionDelegate
//! ├── models/      ← CaptureError, SessionState, SessionConfiguration, FrameBuffer, DeviceHandle
//! ├── dispatch/    ← DispatchLane, DispatchQueuePair
//! ├── session/     ← CaptureSession (state machine), SessionOrchestrator
//! └── processors/  ← DiscardProcessor, DigestProcessor, LevelMeter, PreviewTap
//! ```

pub mod dispatch;
pub mod models;
pub mod processors;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use dispatch::lane::{Admission, DispatchLane, LaneFault};
pub use dispatch::queue_pair::DispatchQueuePair;
pub use models::config::{BackpressurePolicy, SessionConfiguration};
pub use models::device::DeviceHandle;
pub use models::diagnostics::{LaneStats, SessionDiagnostics};
pub use models::error::CaptureError;
pub use models::frame::{AudioFormat, FrameBuffer, FrameFormat, MediaKind, PixelFormat, VideoFormat};
pub use models::state::SessionState;
pub use processors::digest::DigestProcessor;
pub use processors::discard::DiscardProcessor;
pub use processors::level_meter::{AudioLevels, LevelMeter};
pub use processors::preview::PreviewTap;
pub use session::capture_session::CaptureSession;
pub use session::input::CaptureInput;
pub use session::orchestrator::{SessionOrchestrator, StartReport};
pub use traits::capture_source::{CaptureSource, FrameCallback};
pub use traits::device_provider::DeviceProvider;
pub use traits::frame_processor::FrameProcessor;
pub use traits::preview_sink::PreviewSink;
pub use traits::session_delegate::SessionDelegate;
