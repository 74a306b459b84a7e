use std::fmt;

use crate::models::device::DeviceHandle;
use crate::models::error::CaptureError;
use crate::models::frame::MediaKind;
use crate::traits::capture_source::CaptureSource;
use crate::traits::device_provider::DeviceProvider;

/// An opened device ready to be attached to a capture session.
pub struct CaptureInput {
    device: DeviceHandle,
    pub(crate) source: Box<dyn CaptureSource>,
}

impl CaptureInput {
    pub fn new(device: DeviceHandle, source: Box<dyn CaptureSource>) -> Self {
        Self { device, source }
    }

    /// Open `device` through `provider`.
    pub fn open(provider: &dyn DeviceProvider, device: DeviceHandle) -> Result<Self, CaptureError> {
        let source = provider.open(&device)?;
        Ok(Self::new(device, source))
    }

    pub fn device(&self) -> &DeviceHandle {
        &self.device
    }

    pub fn kind(&self) -> MediaKind {
        self.device.kind
    }
}

impl fmt::Debug for CaptureInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureInput")
            .field("device", &self.device)
            .field("running", &self.source.is_running())
            .finish()
    }
}
