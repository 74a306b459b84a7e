use crate::models::device::DeviceHandle;
use crate::models::error::CaptureError;
use crate::models::frame::MediaKind;
use crate::traits::capture_source::CaptureSource;

/// External collaborator that owns hardware access.
///
/// Enumeration UI and OS permission handling live behind this trait; the
/// session only ever asks for the default device of a kind.
pub trait DeviceProvider: Send + Sync {
    /// The default device for `kind`, or `CaptureError::NotFound`.
    fn default_device(&self, kind: MediaKind) -> Result<DeviceHandle, CaptureError>;

    /// Open a frame source for a device previously returned by this provider.
    fn open(&self, device: &DeviceHandle) -> Result<Box<dyn CaptureSource>, CaptureError>;
}
