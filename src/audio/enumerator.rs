//! Render endpoint enumeration using the Windows MMDevice API.
//!
//! Provides COM initialization and the live implementation of the
//! endpoint directory.

use super::device::{AudioEndpoint, AudioError};
use crate::switch::EndpointDirectory;
use windows::core::HRESULT;
use windows::Win32::Devices::Properties::DEVPKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator, DEVICE_STATE_ACTIVE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
    STGM_READ,
};
use windows::Win32::UI::Shell::PropertiesSystem::{IPropertyStore, PROPERTYKEY};

/// HRESULT of ERROR_NOT_FOUND; GetDefaultAudioEndpoint returns it when no
/// render endpoint is active.
const E_NOTFOUND: HRESULT = HRESULT(0x8007_0490_u32 as i32);

/// COM initialization guard that uninitializes COM on drop.
///
/// One guard scopes one switch (or list) operation; it must outlive every
/// COM object created on this thread, the policy handle included.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| AudioError::ComInit { status: e.code().0 })?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Render endpoint directory backed by the MMDevice enumerator.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new DeviceEnumerator.
    ///
    /// Note: COM must be initialized before calling this function.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| AudioError::Enumeration { status: e.code().0 })?;

            Ok(Self { enumerator })
        }
    }

    /// Convert an IMMDevice into an endpoint snapshot.
    fn describe(&self, device: &IMMDevice) -> Result<AudioEndpoint, AudioError> {
        unsafe {
            let id = device
                .GetId()
                .map_err(|e| AudioError::Enumeration { status: e.code().0 })?
                .to_string()
                .map_err(|e| AudioError::StringConversion(e.to_string()))?;

            let props: IPropertyStore = device
                .OpenPropertyStore(STGM_READ)
                .map_err(|e| AudioError::Enumeration { status: e.code().0 })?;

            // DEVPROPKEY and PROPERTYKEY share their layout
            let key = PROPERTYKEY {
                fmtid: DEVPKEY_Device_FriendlyName.fmtid,
                pid: DEVPKEY_Device_FriendlyName.pid,
            };

            let name = match props.GetValue(&key) {
                Ok(value) => value.to_string(),
                Err(_) => String::new(),
            };
            let name = if name.is_empty() {
                "Unknown".to_string()
            } else {
                name
            };

            Ok(AudioEndpoint { id, name })
        }
    }
}

impl EndpointDirectory for DeviceEnumerator {
    /// All active render endpoints with their friendly names.
    fn endpoints(&self) -> Result<Vec<AudioEndpoint>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
                .map_err(|e| AudioError::Enumeration { status: e.code().0 })?;

            let count = collection
                .GetCount()
                .map_err(|e| AudioError::Enumeration { status: e.code().0 })?;

            let mut endpoints = Vec::with_capacity(count as usize);
            for i in 0..count {
                let device = collection
                    .Item(i)
                    .map_err(|e| AudioError::Enumeration { status: e.code().0 })?;
                endpoints.push(self.describe(&device)?);
            }

            Ok(endpoints)
        }
    }

    /// The current default render endpoint (Console role).
    fn default_endpoint(&self) -> Result<AudioEndpoint, AudioError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|e| {
                    if e.code() == E_NOTFOUND {
                        AudioError::NoDefaultDevice
                    } else {
                        AudioError::Enumeration { status: e.code().0 }
                    }
                })?;

            self.describe(&device)
        }
    }
}
