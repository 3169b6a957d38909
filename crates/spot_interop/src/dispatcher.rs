// crates/spot_interop/src/dispatcher.rs
//! Routes host callbacks (menu/toolbar action codes, unload) to handlers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use spot_shared::{callback_reason, CallbackReason};

type Action = Rc<dyn Fn()>;

/// Action-code table consulted by [`master_callback`].
#[derive(Default)]
pub struct CallbackDispatcher {
    actions: RefCell<HashMap<usize, Action>>,
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `code`, replacing any previous handler.
    pub fn set_action(&self, code: usize, handler: impl Fn() + 'static) {
        if self.actions.borrow_mut().insert(code, Rc::new(handler)).is_some() {
            tracing::debug!(code, "replaced action handler");
        }
    }

    pub fn remove_action(&self, code: usize) {
        self.actions.borrow_mut().remove(&code);
    }

    pub fn has_action(&self, code: usize) -> bool {
        self.actions.borrow().contains_key(&code)
    }

    pub fn action_count(&self) -> usize {
        self.actions.borrow().len()
    }

    pub fn clear(&self) {
        self.actions.borrow_mut().clear();
    }

    /// React to one host callback.
    pub fn handle(&self, reason: CallbackReason, info: usize) {
        match reason {
            callback_reason::UNLOADING_PLUGIN => {
                tracing::debug!(
                    actions = self.action_count(),
                    "plugin unloading; clearing actions"
                );
                self.clear();
            }
            callback_reason::ACTION_CODE => self.run_action(info),
            other => tracing::trace!(reason = other, info, "ignoring callback"),
        }
    }

    fn run_action(&self, code: usize) {
        // Release the table before running so the handler may edit it.
        let handler = self.actions.borrow().get(&code).cloned();
        match handler {
            Some(handler) => {
                tracing::debug!(code, "running action");
                handler();
            }
            None => tracing::trace!(code, "no handler for action code"),
        }
    }

    /// Token to hand the host as callback user data.
    pub fn token(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<usize> = self.actions.borrow().keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("CallbackDispatcher").field("actions", &codes).finish()
    }
}

/// Callback entry point whose user data is a [`CallbackDispatcher::token`].
///
/// # Safety
/// `user_data` must be the token of a dispatcher that is still alive.
pub unsafe extern "system" fn master_callback(
    reason: CallbackReason,
    info: usize,
    user_data: usize,
) {
    let dispatcher = &*(user_data as *const CallbackDispatcher);
    if panic::catch_unwind(AssertUnwindSafe(|| dispatcher.handle(reason, info))).is_err() {
        tracing::error!(reason, info, "action handler panicked during host callback; aborting");
        std::process::abort();
    }
}
