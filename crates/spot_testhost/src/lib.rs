// crates/spot_testhost/src/lib.rs
//! In-process stand-in for the Spot host.
//!
//! `MockHost` answers the plug-in action function the way the real host does:
//! it stores typed variables, echoes writes, keeps event bindings and fires
//! them, snapshots variables into named "files" for save/recall, and drives a
//! plug-in's init/callback entry points. Every request is counted so tests can
//! assert on what reached the host.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use spot_shared::{
    callback_reason, host_action, CallbackFn, EventHandlerBinding, EventHandlerFn, GetSetVariable,
    HostAction, HostActionFn, HostEvent, InitFn, SaveRecallVariable, VariableDataType,
};

/// A variable value as the host stores it.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredValue {
    Bool(bool),
    Text(String),
    Numeric(f64),
}

impl StoredValue {
    fn data_type(&self) -> VariableDataType {
        match self {
            StoredValue::Bool(_) => VariableDataType::BOOL,
            StoredValue::Text(_) => VariableDataType::TEXT,
            StoredValue::Numeric(_) => VariableDataType::NUMERIC,
        }
    }
}

/// `(dialog, name)`; globals have no dialog.
type VariableKey = (Option<String>, String);

#[derive(Clone, Copy)]
struct Binding {
    event: HostEvent,
    handler: EventHandlerFn,
    user_data: usize,
}

#[derive(Default)]
struct HostState {
    variables: HashMap<VariableKey, StoredValue>,
    files: HashMap<String, HashMap<VariableKey, StoredValue>>,
    rejected_actions: HashSet<HostAction>,
    rejected_variables: HashSet<String>,
    requests: Vec<HostAction>,
    bindings: Vec<Binding>,
    callback: Option<(CallbackFn, usize)>,
}

/// Scripted host. The plug-in handle it hands out addresses its own state, so
/// the action function needs no globals; the mock must outlive every handle.
pub struct MockHost {
    state: Box<RefCell<HostState>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Box::new(RefCell::new(HostState::default())),
        }
    }

    pub fn action_fn(&self) -> HostActionFn {
        mock_action
    }

    pub fn plugin_handle(&self) -> usize {
        &*self.state as *const RefCell<HostState> as usize
    }

    // ---- variables -------------------------------------------------------------

    pub fn set_variable(&self, name: &str, value: StoredValue) {
        self.state.borrow_mut().variables.insert((None, name.to_string()), value);
    }

    pub fn set_dialog_variable(&self, dialog: &str, name: &str, value: StoredValue) {
        self.state
            .borrow_mut()
            .variables
            .insert((Some(dialog.to_string()), name.to_string()), value);
    }

    pub fn variable(&self, name: &str) -> Option<StoredValue> {
        self.state.borrow().variables.get(&(None, name.to_string())).cloned()
    }

    pub fn dialog_variable(&self, dialog: &str, name: &str) -> Option<StoredValue> {
        self.state
            .borrow()
            .variables
            .get(&(Some(dialog.to_string()), name.to_string()))
            .cloned()
    }

    /// What `save` wrote for global `name` into `path`.
    pub fn saved_value(&self, path: &str, name: &str) -> Option<StoredValue> {
        self.state
            .borrow()
            .files
            .get(path)
            .and_then(|file| file.get(&(None, name.to_string())))
            .cloned()
    }

    /// Seed a saved file entry, as if an earlier session had saved it.
    pub fn save_file_entry(&self, path: &str, name: &str, value: StoredValue) {
        self.state
            .borrow_mut()
            .files
            .entry(path.to_string())
            .or_default()
            .insert((None, name.to_string()), value);
    }

    // ---- scripting -------------------------------------------------------------

    /// Answer `false` to every future request for `action`.
    pub fn reject_action(&self, action: HostAction) {
        self.state.borrow_mut().rejected_actions.insert(action);
    }

    pub fn accept_action(&self, action: HostAction) {
        self.state.borrow_mut().rejected_actions.remove(&action);
    }

    /// Answer `false` to every get/set/save/recall naming `name`.
    pub fn reject_variable(&self, name: &str) {
        self.state.borrow_mut().rejected_variables.insert(name.to_string());
    }

    // ---- inspection ------------------------------------------------------------

    /// Number of requests received for `action`, accepted or not.
    pub fn calls(&self, action: HostAction) -> usize {
        self.state.borrow().requests.iter().filter(|&&a| a == action).count()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<HostAction> {
        self.state.borrow().requests.clone()
    }

    pub fn bound_count(&self, event: HostEvent) -> usize {
        self.state.borrow().bindings.iter().filter(|b| b.event == event).count()
    }

    // ---- driving the plug-in ---------------------------------------------------

    /// Raise `event` with `arg` to every handler bound to it, in bind order.
    pub fn fire(&self, event: HostEvent, arg: usize) {
        // Handlers call back into the host (and may unbind), so no borrow may
        // be held while they run.
        let targets: Vec<Binding> = self
            .state
            .borrow()
            .bindings
            .iter()
            .copied()
            .filter(|b| b.event == event)
            .collect();
        for binding in targets {
            let still_bound = self
                .state
                .borrow()
                .bindings
                .iter()
                .any(|b| b.event == event && b.user_data == binding.user_data);
            if still_bound {
                // SAFETY: the plug-in registered this handler/user-data pair and
                // has not unbound it.
                unsafe { (binding.handler)(event, arg, binding.user_data) };
            }
        }
    }

    /// Call a plug-in's init entry point. Returns its verdict; on success the
    /// callback it chose (if any) is kept for [`send_action_code`](Self::send_action_code)
    /// and [`unload`](Self::unload).
    ///
    /// # Safety
    /// `init` must honour the plug-in init contract.
    pub unsafe fn load(&self, init: InitFn) -> bool {
        let mut callback: Option<CallbackFn> = None;
        let mut user_data = 0usize;
        let accepted = init(
            self.action_fn(),
            self.plugin_handle(),
            0,
            &mut callback,
            &mut user_data,
        );
        if accepted {
            self.state.borrow_mut().callback = callback.map(|cb| (cb, user_data));
        }
        tracing::debug!(accepted, has_callback = callback.is_some(), "plug-in initialised");
        accepted
    }

    pub fn has_callback(&self) -> bool {
        self.state.borrow().callback.is_some()
    }

    /// Deliver a menu/toolbar action code. Returns false when no callback is registered.
    pub fn send_action_code(&self, code: usize) -> bool {
        let callback = self.state.borrow().callback;
        match callback {
            Some((cb, user_data)) => {
                // SAFETY: the plug-in returned this pair from init and has not unloaded.
                unsafe { cb(callback_reason::ACTION_CODE, code, user_data) };
                true
            }
            None => false,
        }
    }

    /// Send the unload notification and forget the callback.
    pub fn unload(&self) -> bool {
        let callback = self.state.borrow_mut().callback.take();
        match callback {
            Some((cb, user_data)) => {
                // SAFETY: as for `send_action_code`; this is the last call.
                unsafe { cb(callback_reason::UNLOADING_PLUGIN, 0, user_data) };
                true
            }
            None => false,
        }
    }
}

unsafe extern "system" fn mock_action(
    plugin_handle: usize,
    action: HostAction,
    _info: usize,
    data: *mut c_void,
) -> bool {
    let cell = &*(plugin_handle as *const RefCell<HostState>);
    let Ok(mut state) = cell.try_borrow_mut() else {
        return false;
    };
    state.requests.push(action);
    if state.rejected_actions.contains(&action) {
        tracing::trace!(action, "mock host rejecting action");
        return false;
    }

    match action {
        host_action::BIND_EVENT_HANDLER => state.bind(data as *const EventHandlerBinding),
        host_action::UNBIND_EVENT_HANDLER => state.unbind(data as *const EventHandlerBinding),
        host_action::GET_VARIABLE => state.get(data as *mut GetSetVariable),
        host_action::SET_VARIABLE => state.set(data as *const GetSetVariable),
        host_action::SAVE_VARIABLE => state.save(data as *const SaveRecallVariable),
        host_action::RECALL_VARIABLE => state.recall(data as *const SaveRecallVariable),
        host_action::ACQ_SINGLE_IMAGE
        | host_action::START_LIVE
        | host_action::PAUSE_LIVE
        | host_action::END_LIVE => true,
        _ => false,
    }
}

unsafe fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

unsafe fn event_list(binding: &EventHandlerBinding) -> &[HostEvent] {
    if binding.host_event_source_list.is_null() {
        &[]
    } else {
        std::slice::from_raw_parts(binding.host_event_source_list, binding.event_source_list_length)
    }
}

impl HostState {
    unsafe fn key(&self, name: *const c_char, dialog: *const c_char) -> Option<VariableKey> {
        let name = read_str(name)?;
        if self.rejected_variables.contains(&name) {
            return None;
        }
        Some((read_str(dialog), name))
    }

    unsafe fn bind(&mut self, binding: *const EventHandlerBinding) -> bool {
        let Some(binding) = binding.as_ref() else {
            return false;
        };
        let Some(handler) = binding.event_handler else {
            return false;
        };
        for &event in event_list(binding) {
            self.bindings
                .retain(|b| !(b.event == event && b.user_data == binding.user_data));
            self.bindings.push(Binding {
                event,
                handler,
                user_data: binding.user_data,
            });
        }
        true
    }

    unsafe fn unbind(&mut self, binding: *const EventHandlerBinding) -> bool {
        let Some(binding) = binding.as_ref() else {
            return false;
        };
        for &event in event_list(binding) {
            self.bindings
                .retain(|b| !(b.event == event && b.user_data == binding.user_data));
        }
        true
    }

    unsafe fn get(&mut self, msg: *mut GetSetVariable) -> bool {
        let Some(msg) = msg.as_mut() else {
            return false;
        };
        let Some(key) = self.key(msg.variable_name, msg.dialog_name) else {
            return false;
        };
        let Some(value) = self.variables.get(&key) else {
            return false;
        };
        if value.data_type() != msg.data_type {
            return false;
        }

        match value {
            StoredValue::Bool(b) => msg.value.boolean = u8::from(*b),
            StoredValue::Numeric(n) => msg.value.numeric = *n,
            StoredValue::Text(s) => {
                let slot = &mut msg.value.text;
                if slot.text.is_null() {
                    return false;
                }
                let n = s.len().min(slot.length);
                ptr::copy_nonoverlapping(s.as_ptr(), slot.text as *mut u8, n);
                *slot.text.add(n) = 0;
                slot.length = n;
            }
        }
        true
    }

    unsafe fn set(&mut self, msg: *const GetSetVariable) -> bool {
        let Some(msg) = msg.as_ref() else {
            return false;
        };
        let Some(key) = self.key(msg.variable_name, msg.dialog_name) else {
            return false;
        };
        let value = match msg.data_type {
            VariableDataType::BOOL => StoredValue::Bool(msg.value.boolean != 0),
            VariableDataType::NUMERIC => StoredValue::Numeric(msg.value.numeric),
            VariableDataType::TEXT => match read_str(msg.value.text.text) {
                Some(text) => StoredValue::Text(text),
                None => return false,
            },
            _ => return false,
        };
        self.variables.insert(key, value);
        true
    }

    unsafe fn save(&mut self, msg: *const SaveRecallVariable) -> bool {
        let Some(msg) = msg.as_ref() else {
            return false;
        };
        let key = self.key(msg.variable_name, msg.dialog_name);
        let (Some(key), Some(path)) = (key, read_str(msg.file_path)) else {
            return false;
        };
        let Some(value) = self.variables.get(&key).cloned() else {
            return false;
        };
        self.files.entry(path).or_default().insert(key, value);
        true
    }

    unsafe fn recall(&mut self, msg: *const SaveRecallVariable) -> bool {
        let Some(msg) = msg.as_ref() else {
            return false;
        };
        let key = self.key(msg.variable_name, msg.dialog_name);
        let (Some(key), Some(path)) = (key, read_str(msg.file_path)) else {
            return false;
        };
        let Some(value) = self.files.get(&path).and_then(|file| file.get(&key)).cloned() else {
            return false;
        };
        self.variables.insert(key, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spot_shared::{host_event, TextValue};
    use std::cell::Cell;
    use std::ffi::CString;

    thread_local! {
        static FIRED: Cell<(u32, usize, usize)> = const { Cell::new((0, 0, 0)) };
    }

    unsafe extern "system" fn record(event: HostEvent, args: usize, user_data: usize) {
        FIRED.with(|f| f.set((event, args, user_data)));
    }

    fn request(mock: &MockHost, action: HostAction, data: *mut c_void) -> bool {
        unsafe { (mock.action_fn())(mock.plugin_handle(), action, 0, data) }
    }

    #[test]
    fn text_get_is_clipped_to_capacity() {
        let mock = MockHost::new();
        mock.set_variable("Label", StoredValue::Text("abcdef".into()));
        let name = CString::new("Label").unwrap();
        let mut buf = [0xffu8; 4];
        let mut msg = GetSetVariable {
            variable_name: name.as_ptr(),
            data_type: VariableDataType::TEXT,
            ..Default::default()
        };
        msg.value.text = TextValue::from_buffer(&mut buf);

        assert!(request(&mock, host_action::GET_VARIABLE, &mut msg as *mut _ as *mut c_void));
        assert_eq!(unsafe { msg.value.text.length }, 3);
        assert_eq!(&buf, b"abc\0");
    }

    #[test]
    fn type_mismatch_and_missing_variables_fail() {
        let mock = MockHost::new();
        mock.set_variable("Flag", StoredValue::Bool(true));
        let name = CString::new("Flag").unwrap();
        let mut msg = GetSetVariable {
            variable_name: name.as_ptr(),
            data_type: VariableDataType::NUMERIC,
            ..Default::default()
        };
        assert!(!request(&mock, host_action::GET_VARIABLE, &mut msg as *mut _ as *mut c_void));

        let missing = CString::new("Nope").unwrap();
        msg.variable_name = missing.as_ptr();
        assert!(!request(&mock, host_action::GET_VARIABLE, &mut msg as *mut _ as *mut c_void));
        assert_eq!(mock.calls(host_action::GET_VARIABLE), 2);
    }

    #[test]
    fn rebinding_a_token_replaces_the_handler() {
        let mock = MockHost::new();
        let mut events = [host_event::IDLE];
        let mut binding = EventHandlerBinding {
            event_handler: Some(record),
            user_data: 7,
            event_source_list_length: 1,
            host_event_source_list: events.as_mut_ptr(),
            ..Default::default()
        };
        let data = &mut binding as *mut EventHandlerBinding as *mut c_void;
        assert!(request(&mock, host_action::BIND_EVENT_HANDLER, data));
        assert!(request(&mock, host_action::BIND_EVENT_HANDLER, data));
        assert_eq!(mock.bound_count(host_event::IDLE), 1);

        mock.fire(host_event::IDLE, 99);
        assert_eq!(FIRED.with(Cell::get), (host_event::IDLE, 99, 7));

        assert!(request(&mock, host_action::UNBIND_EVENT_HANDLER, data));
        assert_eq!(mock.bound_count(host_event::IDLE), 0);
    }

    #[test]
    fn rejected_actions_are_still_counted() {
        let mock = MockHost::new();
        mock.reject_action(host_action::START_LIVE);
        assert!(!request(&mock, host_action::START_LIVE, ptr::null_mut()));
        mock.accept_action(host_action::START_LIVE);
        assert!(request(&mock, host_action::START_LIVE, ptr::null_mut()));
        assert_eq!(mock.calls(host_action::START_LIVE), 2);
        assert_eq!(mock.requests(), vec![host_action::START_LIVE; 2]);
    }

    #[test]
    fn no_callback_means_nothing_to_deliver() {
        let mock = MockHost::new();
        assert!(!mock.has_callback());
        assert!(!mock.send_action_code(1));
        assert!(!mock.unload());
    }
}
