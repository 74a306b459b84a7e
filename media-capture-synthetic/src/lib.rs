//! # media-capture-synthetic
//!
//! Software capture backend for media-capture-kit.
//!
//! Provides:
//! - `SyntheticDeviceProvider`: default "camera" and "microphone" devices
//! - `TestPatternSource`: scrolling gradient video at a fixed frame rate
//! - `ToneSource`: continuous sine tone in fixed-size audio chunks
//!
//! Useful for demos and for exercising a pipeline on machines without
//! capture hardware.
//!
//! ## Usage
//! ```no_run
//! use media_capture_core::{DigestProcessor, SessionConfiguration, SessionOrchestrator};
//! use media_capture_synthetic::SyntheticDeviceProvider;
//!
//! let mut orch = SessionOrchestrator::new(
//!     SyntheticDeviceProvider::new(),
//!     SessionConfiguration::default(),
//! )
//! .unwrap();
//! orch.start(Some(Box::new(DigestProcessor::new())), None).unwrap();
//! ```

mod producer;

pub mod pattern;
pub mod provider;
pub mod tone;

pub use pattern::{TestPatternSource, VideoSpec};
pub use provider::SyntheticDeviceProvider;
pub use tone::{ToneSource, ToneSpec};
