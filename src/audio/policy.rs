//! Default-endpoint reassignment through the undocumented IPolicyConfig
//! COM interface.
//!
//! Windows exposes no supported API for changing the default render
//! endpoint; the Sound control panel goes through a private policy class
//! instead. The interface ships without type information, so its methods
//! are reached by reading function pointers out of the instance vtable at
//! fixed slot indices. The slot table below is the entire ABI contract of
//! this module: the indices and signatures are version-sensitive constants
//! and must never be derived at runtime.

use std::ffi::c_void;

use windows::core::{IUnknown, Interface, GUID, HRESULT, PCWSTR};
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_ALL};

use super::device::{AudioError, DeviceRole};
use crate::switch::{EndpointPolicy, PolicyBinder};

/// Class ID of the policy component the Sound control panel activates.
pub const CLSID_POLICY_CONFIG: GUID = GUID::from_u128(0x870af99c_171d_4f9e_af0d_e63df40c2bc9);

/// Interface ID of IPolicyConfig.
pub const IID_POLICY_CONFIG: GUID = GUID::from_u128(0xf8679f50_850a_41cf_9c72_430f290290c8);

// IPolicyConfig vtable layout (stable across Windows 10/11):
//    0 QueryInterface      1 AddRef              2 Release
//    3 GetMixFormat        4 GetDeviceFormat     5 ResetDeviceFormat
//    6 SetDeviceFormat     7 GetProcessingPeriod 8 SetProcessingPeriod
//    9 GetShareMode       10 SetShareMode       11 GetPropertyValue
//   12 SetPropertyValue   13 SetDefaultEndpoint 14 SetEndpointVisibility
// Only Release and SetDefaultEndpoint are ever called.

/// Vtable slot of IUnknown::Release.
const RELEASE_SLOT: usize = 2;

/// Vtable slot of IPolicyConfig::SetDefaultEndpoint.
const SET_DEFAULT_ENDPOINT_SLOT: usize = 13;

/// ULONG STDMETHODCALLTYPE Release();
type ReleaseFn = unsafe extern "system" fn(this: *mut c_void) -> u32;

/// HRESULT STDMETHODCALLTYPE SetDefaultEndpoint(PCWSTR wszDeviceId, ERole role);
type SetDefaultEndpointFn =
    unsafe extern "system" fn(this: *mut c_void, device_id: PCWSTR, role: i32) -> HRESULT;

/// A bound instance of the policy interface.
///
/// Holds exactly one COM reference. Both methods this crate needs are
/// resolved from the vtable once, here; dropping the value releases the
/// reference through the resolved Release slot.
pub struct PolicyConfig {
    handle: *mut c_void,
    release: ReleaseFn,
    set_default: SetDefaultEndpointFn,
}

impl PolicyConfig {
    /// Activate the policy component and bind its method table.
    pub fn bind() -> Result<Self, AudioError> {
        let unknown: IUnknown =
            unsafe { CoCreateInstance(&CLSID_POLICY_CONFIG, None, CLSCTX_ALL) }
                .map_err(|e| AudioError::Activation { status: e.code().0 })?;

        let mut handle: *mut c_void = std::ptr::null_mut();
        let hr = unsafe { unknown.query(&IID_POLICY_CONFIG, &mut handle) };
        if hr.is_err() {
            return Err(AudioError::Activation { status: hr.0 });
        }
        if handle.is_null() {
            return Err(AudioError::InvalidInterface);
        }

        // The first pointer-sized field of a COM object is its vtable.
        let vtable = unsafe { *handle.cast::<*const *const c_void>() };
        if vtable.is_null() {
            // Release lives in the same unreachable table; nothing to call.
            return Err(AudioError::InvalidInterface);
        }

        let release_ptr = unsafe { *vtable.add(RELEASE_SLOT) };
        if release_ptr.is_null() {
            return Err(AudioError::InvalidInterface);
        }
        let release = unsafe { std::mem::transmute::<*const c_void, ReleaseFn>(release_ptr) };

        let set_default_ptr = unsafe { *vtable.add(SET_DEFAULT_ENDPOINT_SLOT) };
        if set_default_ptr.is_null() {
            unsafe { release(handle) };
            return Err(AudioError::InvalidInterface);
        }
        let set_default =
            unsafe { std::mem::transmute::<*const c_void, SetDefaultEndpointFn>(set_default_ptr) };

        Ok(Self {
            handle,
            release,
            set_default,
        })
    }
}

impl EndpointPolicy for PolicyConfig {
    /// Assign the endpoint as default for one role.
    ///
    /// A non-zero HRESULT from the call is a per-role failure the caller
    /// may tolerate, not a reason to stop the remaining roles.
    fn set_default_endpoint(
        &self,
        endpoint_id: &str,
        role: DeviceRole,
    ) -> Result<(), AudioError> {
        let id_wide: Vec<u16> = endpoint_id
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        let hr = unsafe {
            (self.set_default)(self.handle, PCWSTR(id_wide.as_ptr()), role.as_raw())
        };
        if hr.is_ok() {
            Ok(())
        } else {
            Err(AudioError::EndpointAssignment {
                role,
                status: hr.0,
            })
        }
    }
}

impl Drop for PolicyConfig {
    fn drop(&mut self) {
        // The one reference taken in bind(), returned through slot 2.
        unsafe {
            (self.release)(self.handle);
        }
    }
}

/// Binder that activates the live policy component.
pub struct PolicyConfigBinder;

impl PolicyBinder for PolicyConfigBinder {
    type Policy = PolicyConfig;

    fn bind(&self) -> Result<PolicyConfig, AudioError> {
        PolicyConfig::bind()
    }
}
