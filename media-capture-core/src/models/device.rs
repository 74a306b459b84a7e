use std::fmt;

use serde::{Deserialize, Serialize};

use super::frame::MediaKind;

/// Opaque reference to a capture device, handed out by a `DeviceProvider`.
///
/// The session references the device while it is attached but never owns
/// its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
}

impl DeviceHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} device '{}' ({})", self.kind, self.name, self.id)
    }
}
