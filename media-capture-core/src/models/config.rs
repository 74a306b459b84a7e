use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// What a dispatch lane does with a new frame when its queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackpressurePolicy {
    /// Evict the oldest queued frame to make room.
    #[default]
    DropOldest,
    /// Block the producer until the processor frees a slot.
    BlockProducer,
    /// Refuse the incoming frame.
    DropNewest,
}

/// Configuration for a capture session and its dispatch lanes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfiguration {
    /// Bounded queue depth of each dispatch lane (default: 8).
    pub lane_capacity: usize,

    /// Policy applied when a lane's queue is full (default: drop-oldest).
    pub backpressure: BackpressurePolicy,

    /// Maximum attached inputs per media kind (default: 1).
    pub max_inputs_per_kind: usize,

    /// Ask the device provider for a video device (default: true).
    pub enable_video: bool,

    /// Ask the device provider for an audio device (default: true).
    pub enable_audio: bool,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.lane_capacity == 0 {
            return Err("lane capacity must be at least 1".into());
        }
        if self.max_inputs_per_kind == 0 {
            return Err("max inputs per kind must be at least 1".into());
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::Configuration(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CaptureError::Configuration)?;
        Ok(config)
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            lane_capacity: 8,
            backpressure: BackpressurePolicy::DropOldest,
            max_inputs_per_kind: 1,
            enable_video: true,
            enable_audio: true,
        }
    }
}
