//! Windows default audio output switcher.
//!
//! Toggles the system default render endpoint between a configured pair of
//! devices, for the Console, Multimedia and Communications roles, using the
//! undocumented `IPolicyConfig` COM interface.
//!
//! ## Features
//!
//! - Enumerate active render endpoints with friendly names
//! - Toggle the default endpoint between two configured devices
//! - Per-role outcome reporting; partial failure never aborts remaining roles
//! - `--list` diagnostic mode

pub mod audio;
pub mod switch;

pub use audio::{AudioEndpoint, AudioError, DeviceRole};
pub use switch::{SwitchConfig, SwitchController, SwitchOutcome};
