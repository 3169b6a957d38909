// crates/spot_interop/src/host.rs
//! The plug-in's view of the host: the action function plus the handle the
//! host gave us at initialization. Every plugin→host call funnels through here.

use std::ffi::c_void;
use std::fmt;

use spot_shared::{
    host_action, EventHandlerBinding, EventHandlerFn, HostAction, HostActionFn, HostEvent,
};

use crate::error::{InteropError, Result};

/// Copyable handle for issuing action requests to the host.
///
/// Replaces a process-wide "current host" global: whoever needs to call the
/// host is handed one of these.
#[derive(Clone, Copy)]
pub struct Host {
    action_fn: HostActionFn,
    plugin_handle: usize,
}

impl Host {
    /// # Safety
    /// `action_fn` must be the host action function received in `PluginInitialize`
    /// (or a stub honouring the same contract) and must stay callable for as long
    /// as this handle or any copy of it is used.
    pub unsafe fn new(action_fn: HostActionFn, plugin_handle: usize) -> Self {
        Self {
            action_fn,
            plugin_handle,
        }
    }

    pub fn plugin_handle(&self) -> usize {
        self.plugin_handle
    }

    /// Send one action request. Returns the host's verdict.
    ///
    /// # Safety
    /// `data` must be null or point to the payload type the host expects for
    /// `action`, valid for the duration of the call.
    pub unsafe fn request_raw(&self, action: HostAction, info: usize, data: *mut c_void) -> bool {
        (self.action_fn)(self.plugin_handle, action, info, data)
    }

    /// Only for the payload-free acquisition actions below.
    fn trigger(&self, action: HostAction, name: &'static str) -> Result<()> {
        // SAFETY: acquisition triggers carry no payload and ignore `data`.
        let accepted = unsafe { self.request_raw(action, 0, std::ptr::null_mut()) };
        if accepted {
            Ok(())
        } else {
            tracing::warn!(action, "host rejected {name}");
            Err(InteropError::host(name, "host"))
        }
    }

    pub fn acquire_single_image(&self) -> Result<()> {
        self.trigger(host_action::ACQ_SINGLE_IMAGE, "acquire single image")
    }

    pub fn start_live(&self) -> Result<()> {
        self.trigger(host_action::START_LIVE, "start live")
    }

    pub fn pause_live(&self) -> Result<()> {
        self.trigger(host_action::PAUSE_LIVE, "pause live")
    }

    pub fn end_live(&self) -> Result<()> {
        self.trigger(host_action::END_LIVE, "end live")
    }

    /// Bind `handler` to every event in `events`. `user_data` is handed back to
    /// the handler on each notification.
    pub fn bind_events(
        &self,
        events: &mut [HostEvent],
        handler: EventHandlerFn,
        user_data: usize,
    ) -> bool {
        let mut binding = EventHandlerBinding {
            event_handler: Some(handler),
            user_data,
            event_source_list_length: events.len(),
            host_event_source_list: events.as_mut_ptr(),
            ..Default::default()
        };
        // SAFETY: binding and the event list outlive the call.
        unsafe {
            self.request_raw(
                host_action::BIND_EVENT_HANDLER,
                0,
                &mut binding as *mut EventHandlerBinding as *mut c_void,
            )
        }
    }

    pub fn unbind_events(&self, events: &mut [HostEvent], user_data: usize) -> bool {
        let mut binding = EventHandlerBinding {
            user_data,
            event_source_list_length: events.len(),
            host_event_source_list: events.as_mut_ptr(),
            ..Default::default()
        };
        // SAFETY: binding and the event list outlive the call.
        unsafe {
            self.request_raw(
                host_action::UNBIND_EVENT_HANDLER,
                0,
                &mut binding as *mut EventHandlerBinding as *mut c_void,
            )
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("plugin_handle", &format_args!("{:#x}", self.plugin_handle))
            .finish()
    }
}
