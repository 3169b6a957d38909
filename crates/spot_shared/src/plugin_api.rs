// crates/spot_shared/src/plugin_api.rs
//! Binary contract between the Spot host application and its plug-ins.
//!
//! Every type here mirrors the host's C declarations field for field. The host
//! packs its structures to 8 bytes; since no field here is aligned above 8,
//! plain `repr(C)` produces the identical layout.

use core::ffi::{c_char, c_void, CStr};
use core::ptr;

// ==================================================================================
// 1. IDENTIFIERS
// ==================================================================================

pub type HostAction = u32;
pub type HostEvent = u32;
pub type CallbackReason = u32;

/// Requests a plug-in can send through [`HostActionFn`].
pub mod host_action {
    use super::HostAction;

    pub const UNKNOWN: HostAction = 0;
    /// Payload: [`EventHandlerBinding`](super::EventHandlerBinding)
    pub const BIND_EVENT_HANDLER: HostAction = 1;
    /// Payload: [`EventHandlerBinding`](super::EventHandlerBinding)
    pub const UNBIND_EVENT_HANDLER: HostAction = 2;
    /// Payload: [`GetSetVariable`](super::GetSetVariable)
    pub const GET_VARIABLE: HostAction = 10;
    /// Payload: [`GetSetVariable`](super::GetSetVariable)
    pub const SET_VARIABLE: HostAction = 20;
    /// Payload: [`SaveRecallVariable`](super::SaveRecallVariable)
    pub const SAVE_VARIABLE: HostAction = 24;
    /// Payload: [`SaveRecallVariable`](super::SaveRecallVariable)
    pub const RECALL_VARIABLE: HostAction = 25;
    pub const ACQ_SINGLE_IMAGE: HostAction = 30;
    pub const START_LIVE: HostAction = 40;
    pub const PAUSE_LIVE: HostAction = 41;
    pub const END_LIVE: HostAction = 42;
}

/// Occurrences the host can notify a bound event handler about.
pub mod host_event {
    use super::HostEvent;

    /// The host has finished updating the UI from a previous action.
    pub const IDLE: HostEvent = 0;
    /// The application is about to close.
    pub const APPLICATION_CLOSING: HostEvent = 1;
    /// A new image document has focus.
    pub const IMAGE_DOC_CHANGED: HostEvent = 10;
    /// Argument is a read-only C string naming the camera.
    pub const CAMERA_INITIALIZED: HostEvent = 11;
}

/// Reasons passed to the plug-in's main callback.
pub mod callback_reason {
    use super::CallbackReason;

    pub const UNKNOWN: CallbackReason = 0;
    /// The host is about to unload the library. `info` is undefined.
    pub const UNLOADING_PLUGIN: CallbackReason = 1;
    /// `info` carries a numeric action code.
    pub const ACTION_CODE: CallbackReason = 2;
}

// ==================================================================================
// 2. FUNCTION SIGNATURES
// ==================================================================================
// `extern "system"` is stdcall on 32-bit Windows and the C convention elsewhere,
// which is exactly what the host's SPOTPLUGINAPI macro expands to.

pub type EventHandlerFn =
    unsafe extern "system" fn(event: HostEvent, args: usize, user_data: usize);

pub type HostActionFn = unsafe extern "system" fn(
    plugin_handle: usize,
    action: HostAction,
    info: usize,
    data: *mut c_void,
) -> bool;

pub type CallbackFn =
    unsafe extern "system" fn(reason: CallbackReason, info: usize, user_data: usize);

pub type InitFn = unsafe extern "system" fn(
    host_action: HostActionFn,
    plugin_handle: usize,
    info: usize,
    callback: *mut Option<CallbackFn>,
    user_data: *mut usize,
) -> bool;

/// Name of the export the host resolves after loading the library.
pub const PLUGIN_INIT_SYMBOL: &str = "PluginInitialize";

// ==================================================================================
// 3. PAYLOADS
// ==================================================================================

/// Text slot of a variable message.
///
/// On a get request `length` is the writable capacity of `text` (which must hold
/// `length + 1` bytes); the host overwrites it with the resulting string length.
/// On a set request `length` is the length of the string being sent.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TextValue {
    pub length: usize,
    pub text: *mut c_char,
}

impl TextValue {
    /// Borrow a NUL-terminated string for a set request. The host only reads it.
    pub fn from_c_str(s: &CStr) -> Self {
        Self {
            length: s.to_bytes().len(),
            text: s.as_ptr() as *mut c_char,
        }
    }

    /// Describe a writable buffer for a get request. One byte is kept back for the
    /// terminator, so an empty buffer yields a zero capacity.
    pub fn from_buffer(buf: &mut [u8]) -> Self {
        Self {
            length: buf.len().saturating_sub(1),
            text: buf.as_mut_ptr() as *mut c_char,
        }
    }

    /// Force a terminator at `length` and return the string.
    ///
    /// # Safety
    /// `text` must point to at least `length + 1` writable bytes.
    pub unsafe fn c_str(&mut self) -> &CStr {
        let end = self.text.add(self.length);
        if *end != 0 {
            *end = 0;
        }
        CStr::from_ptr(self.text)
    }

    /// Re-measure after the buffer contents changed. The length can only shrink;
    /// returns how much it shrank by.
    ///
    /// # Safety
    /// `text` must point to at least `length + 1` writable bytes.
    pub unsafe fn update_length(&mut self) -> usize {
        *self.text.add(self.length) = 0;
        let original = self.length;
        self.length = CStr::from_ptr(self.text).to_bytes().len();
        original - self.length
    }
}

/// Tag of a [`GetSetVariable`] message. The host reserves an `intmax_t` for it.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariableDataType(pub i64);

impl VariableDataType {
    pub const UNKNOWN: Self = Self(0);
    pub const TEXT: Self = Self(1);
    pub const NUMERIC: Self = Self(2);
    pub const BOOL: Self = Self(4);
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union VariablePayload {
    pub numeric: f64,
    /// 0 is false, anything else true.
    pub boolean: u8,
    pub text: TextValue,
}

#[repr(C)]
pub struct EventHandlerBinding {
    /// Read only.
    pub version: i32,
    /// Ignored when unbinding.
    pub event_handler: Option<EventHandlerFn>,
    pub user_data: usize,
    pub event_source_list_length: usize,
    pub host_event_source_list: *mut HostEvent,
}

impl Default for EventHandlerBinding {
    fn default() -> Self {
        Self {
            version: 0,
            event_handler: None,
            user_data: 0,
            event_source_list_length: 0,
            host_event_source_list: ptr::null_mut(),
        }
    }
}

#[repr(C)]
pub struct GetSetVariable {
    /// Read only.
    pub version: i32,
    pub reserved: u32,
    pub variable_name: *const c_char,
    /// Owning dialog for embedded variables; null for globals.
    pub dialog_name: *const c_char,
    pub data_type: VariableDataType,
    pub value: VariablePayload,
}

impl Default for GetSetVariable {
    fn default() -> Self {
        Self {
            version: 0,
            reserved: 0,
            variable_name: ptr::null(),
            dialog_name: ptr::null(),
            data_type: VariableDataType::UNKNOWN,
            value: VariablePayload { numeric: 0.0 },
        }
    }
}

#[repr(C)]
pub struct SaveRecallVariable {
    /// Read only.
    pub version: i32,
    pub reserved: u32,
    pub variable_name: *const c_char,
    pub dialog_name: *const c_char,
    pub file_path: *const c_char,
}

impl Default for SaveRecallVariable {
    fn default() -> Self {
        Self {
            version: 0,
            reserved: 0,
            variable_name: ptr::null(),
            dialog_name: ptr::null(),
            file_path: ptr::null(),
        }
    }
}
