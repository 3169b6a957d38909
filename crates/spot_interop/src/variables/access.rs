// crates/spot_interop/src/variables/access.rs
//! Typed wrappers around the host's untyped get/set/save/recall requests.

use std::ffi::{c_void, CStr, CString};
use std::ptr;

use spot_shared::{
    host_action, GetSetVariable, HostAction, SaveRecallVariable, TextValue, VariableDataType,
};

use crate::error::{InteropError, Result};
use crate::host::Host;

/// Longest text value read when the caller does not pick a bound.
pub const DEFAULT_TEXT_READ_LIMIT: usize = 1024;

/// Largest text read the exchange buffer is sized for. Bigger bounds are clamped.
pub const MAX_TEXT_READ_LIMIT: usize = 65535;

/// Where a variable lives: its name and, for dialog-embedded variables, the
/// owning dialog.
#[derive(Clone, Copy, Debug)]
pub struct VariableAddress<'a> {
    pub name: &'a CStr,
    pub dialog: Option<&'a CStr>,
}

impl<'a> VariableAddress<'a> {
    pub fn global(name: &'a CStr) -> Self {
        Self { name, dialog: None }
    }

    fn label(&self) -> String {
        let name = self.name.to_string_lossy();
        match self.dialog {
            Some(dialog) => format!("{}/{}", dialog.to_string_lossy(), name),
            None => name.into_owned(),
        }
    }

    fn dialog_ptr(&self) -> *const std::ffi::c_char {
        self.dialog.map_or(ptr::null(), CStr::as_ptr)
    }
}

pub(crate) fn to_c_string(what: &str, text: &str) -> Result<CString> {
    CString::new(text).map_err(|_| {
        InteropError::InvalidOperation(format!("{what} contains an interior NUL byte: {text:?}"))
    })
}

fn send_variable_message(host: &Host, action: HostAction, msg: &mut GetSetVariable) -> bool {
    // SAFETY: `msg` is a fully initialised get/set payload whose string pointers
    // borrow from values that outlive this call.
    unsafe { host.request_raw(action, 0, msg as *mut GetSetVariable as *mut c_void) }
}

fn variable_message(var: VariableAddress<'_>, data_type: VariableDataType) -> GetSetVariable {
    GetSetVariable {
        variable_name: var.name.as_ptr(),
        dialog_name: var.dialog_ptr(),
        data_type,
        ..Default::default()
    }
}

fn rejected(request: &'static str, var: VariableAddress<'_>) -> InteropError {
    let target = var.label();
    tracing::warn!(variable = %target, "host rejected {request}");
    InteropError::host(request, target)
}

// ==================================================================================
// Address-based accessors
// ==================================================================================

pub fn get_bool(host: &Host, var: VariableAddress<'_>) -> Result<bool> {
    let mut msg = variable_message(var, VariableDataType::BOOL);
    if !send_variable_message(host, host_action::GET_VARIABLE, &mut msg) {
        return Err(rejected("get Boolean variable", var));
    }
    // SAFETY: the host fills the Bool arm for a Bool request.
    Ok(unsafe { msg.value.boolean } != 0)
}

pub fn set_bool(host: &Host, var: VariableAddress<'_>, value: bool) -> Result<()> {
    let mut msg = variable_message(var, VariableDataType::BOOL);
    msg.value.boolean = u8::from(value);
    if !send_variable_message(host, host_action::SET_VARIABLE, &mut msg) {
        return Err(rejected("set Boolean variable", var));
    }
    Ok(())
}

pub fn get_numeric(host: &Host, var: VariableAddress<'_>) -> Result<f64> {
    let mut msg = variable_message(var, VariableDataType::NUMERIC);
    if !send_variable_message(host, host_action::GET_VARIABLE, &mut msg) {
        return Err(rejected("get numeric variable", var));
    }
    // SAFETY: the host fills the Numeric arm for a Numeric request.
    Ok(unsafe { msg.value.numeric })
}

pub fn set_numeric(host: &Host, var: VariableAddress<'_>, value: f64) -> Result<()> {
    let mut msg = variable_message(var, VariableDataType::NUMERIC);
    msg.value.numeric = value;
    if !send_variable_message(host, host_action::SET_VARIABLE, &mut msg) {
        return Err(rejected("set numeric variable", var));
    }
    Ok(())
}

/// Read a text variable, keeping at most `max_len` bytes. Longer values are
/// clipped by the fixed-size exchange buffer rather than reported as errors.
///
/// `max_len` is clamped to [`MAX_TEXT_READ_LIMIT`].
pub fn get_text(host: &Host, var: VariableAddress<'_>, max_len: usize) -> Result<String> {
    let max_len = max_len.min(MAX_TEXT_READ_LIMIT);
    let mut buf = vec![0u8; max_len + 1];
    let mut msg = variable_message(var, VariableDataType::TEXT);
    msg.value.text = TextValue::from_buffer(&mut buf);
    if !send_variable_message(host, host_action::GET_VARIABLE, &mut msg) {
        return Err(rejected("get text variable", var));
    }

    // SAFETY: the host fills the Text arm for a Text request.
    let reported = unsafe { msg.value.text.length };
    let end = reported.min(max_len);
    buf[end] = 0;
    let len = buf.iter().position(|&b| b == 0).unwrap_or(end);
    Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
}

pub fn set_text(host: &Host, var: VariableAddress<'_>, value: &str) -> Result<()> {
    let text = to_c_string("text value", value)?;
    let mut msg = variable_message(var, VariableDataType::TEXT);
    msg.value.text = TextValue::from_c_str(&text);
    if !send_variable_message(host, host_action::SET_VARIABLE, &mut msg) {
        return Err(rejected("set text variable", var));
    }
    Ok(())
}

fn save_recall(
    host: &Host,
    action: HostAction,
    var: VariableAddress<'_>,
    file_path: &str,
) -> Result<()> {
    let path = to_c_string("file path", file_path)?;
    let mut msg = SaveRecallVariable {
        variable_name: var.name.as_ptr(),
        dialog_name: var.dialog_ptr(),
        file_path: path.as_ptr(),
        ..Default::default()
    };
    let data = &mut msg as *mut SaveRecallVariable as *mut c_void;
    // SAFETY: `msg` and the strings it points at outlive the call.
    let accepted = unsafe { host.request_raw(action, 0, data) };
    if accepted {
        return Ok(());
    }
    let request = if action == host_action::SAVE_VARIABLE {
        "save variable"
    } else {
        "recall variable"
    };
    tracing::warn!(variable = %var.label(), file = file_path, "host rejected {request}");
    Err(InteropError::host(request, format!("{} ({file_path})", var.label())))
}

/// Write the variable's current value to `file_path` using the host's own format.
pub fn save(host: &Host, var: VariableAddress<'_>, file_path: &str) -> Result<()> {
    save_recall(host, host_action::SAVE_VARIABLE, var, file_path)
}

/// Load the variable's value back from a file written by [`save`].
pub fn recall(host: &Host, var: VariableAddress<'_>, file_path: &str) -> Result<()> {
    save_recall(host, host_action::RECALL_VARIABLE, var, file_path)
}

// ==================================================================================
// Name-based accessors for global variables
// ==================================================================================

fn with_global<T>(name: &str, f: impl FnOnce(VariableAddress<'_>) -> Result<T>) -> Result<T> {
    let name = to_c_string("variable name", name)?;
    f(VariableAddress::global(&name))
}

pub fn get_bool_variable(host: &Host, name: &str) -> Result<bool> {
    with_global(name, |var| get_bool(host, var))
}

pub fn set_bool_variable(host: &Host, name: &str, value: bool) -> Result<()> {
    with_global(name, |var| set_bool(host, var, value))
}

pub fn get_numeric_variable(host: &Host, name: &str) -> Result<f64> {
    with_global(name, |var| get_numeric(host, var))
}

pub fn set_numeric_variable(host: &Host, name: &str, value: f64) -> Result<()> {
    with_global(name, |var| set_numeric(host, var, value))
}

/// Read a global text variable, up to [`DEFAULT_TEXT_READ_LIMIT`] bytes.
pub fn get_text_variable(host: &Host, name: &str) -> Result<String> {
    get_text_variable_bounded(host, name, DEFAULT_TEXT_READ_LIMIT)
}

pub fn get_text_variable_bounded(host: &Host, name: &str, max_len: usize) -> Result<String> {
    with_global(name, |var| get_text(host, var, max_len))
}

pub fn set_text_variable(host: &Host, name: &str, value: &str) -> Result<()> {
    with_global(name, |var| set_text(host, var, value))
}

pub fn save_variable(host: &Host, name: &str, file_path: &str) -> Result<()> {
    with_global(name, |var| save(host, var, file_path))
}

pub fn restore_variable_from_file(host: &Host, name: &str, file_path: &str) -> Result<()> {
    with_global(name, |var| recall(host, var, file_path))
}
