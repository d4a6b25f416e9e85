//! Audio endpoint data models.
//!
//! Defines the core data structures for representing render endpoints,
//! device roles, and the error taxonomy shared across the crate.

use thiserror::Error;

/// A playback endpoint as seen in one enumeration pass.
///
/// The ID is the opaque, stable identifier Windows assigns to the endpoint
/// (from `IMMDevice::GetId`); the name is the human-readable friendly name
/// from the device property store. Names are not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEndpoint {
    /// Unique Windows device ID (opaque string from IMMDevice::GetId)
    pub id: String,

    /// Human-readable device name (from device properties)
    pub name: String,
}

impl AudioEndpoint {
    /// Create a new AudioEndpoint.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Audio device role (maps to the Windows ERole enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DeviceRole {
    /// Used by games, system sounds, most general applications
    Console = 0,

    /// Used by music players, video players
    Multimedia = 1,

    /// Used by Teams, Zoom, Discord, and other VoIP applications
    Communications = 2,
}

/// Every role a default-endpoint assignment is tracked for.
///
/// Windows does not link roles together; a device becomes the default for
/// all playback only when each role is assigned explicitly.
pub const ALL_ROLES: [DeviceRole; 3] = [
    DeviceRole::Console,
    DeviceRole::Multimedia,
    DeviceRole::Communications,
];

impl DeviceRole {
    /// The raw ERole value passed across the COM boundary.
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceRole::Console => "console",
            DeviceRole::Multimedia => "multimedia",
            DeviceRole::Communications => "communications",
        };
        f.write_str(name)
    }
}

/// Audio switcher error types.
///
/// Status payloads are raw HRESULT values from the failing platform call.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("COM initialization failed: 0x{status:08X}")]
    ComInit { status: i32 },

    #[error("policy component activation failed: 0x{status:08X}")]
    Activation { status: i32 },

    #[error("policy interface handle is unusable")]
    InvalidInterface,

    #[error("failed to enumerate render endpoints: 0x{status:08X}")]
    Enumeration { status: i32 },

    #[error("no active default render endpoint")]
    NoDefaultDevice,

    #[error("configured device(s) not found: {missing:?} (found: {found:?})")]
    DeviceNotFound {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("failed to set default endpoint for {role} role: 0x{status:08X}")]
    EndpointAssignment { role: DeviceRole, status: i32 },

    #[error("string conversion error: {0}")]
    StringConversion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_values_match_platform_abi() {
        assert_eq!(DeviceRole::Console.as_raw(), 0);
        assert_eq!(DeviceRole::Multimedia.as_raw(), 1);
        assert_eq!(DeviceRole::Communications.as_raw(), 2);
    }

    #[test]
    fn all_roles_covers_each_role_once() {
        assert_eq!(ALL_ROLES.len(), 3);
        for role in [
            DeviceRole::Console,
            DeviceRole::Multimedia,
            DeviceRole::Communications,
        ] {
            assert_eq!(ALL_ROLES.iter().filter(|r| **r == role).count(), 1);
        }
    }

    #[test]
    fn assignment_error_reports_role_and_status() {
        let err = AudioError::EndpointAssignment {
            role: DeviceRole::Communications,
            status: 0x8007_0005_u32 as i32,
        };
        assert_eq!(
            err.to_string(),
            "failed to set default endpoint for communications role: 0x80070005"
        );
    }
}
