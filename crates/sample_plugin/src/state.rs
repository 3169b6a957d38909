// crates/sample_plugin/src/state.rs

use std::cell::{Cell, OnceCell, Ref, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};

use spot_interop::variables::access;
use spot_interop::{
    add_logger_to_event, make_event_delegate, CallbackDispatcher, Delegate, Host, HostEvents,
    IntegerVariable, InteropError, Result, TextVariable, Value, VariableRegistry,
};

use crate::config::PluginConfig;

/// Starts live view unless it is already running.
pub const ACTION_START_LIVE: usize = 1;
/// Writes `_argT1 + _argT2 + LiveImgCount` into `_argT3`.
pub const ACTION_CONCAT_ARGS: usize = 10;

/// Standard variables, read from the host on first use and then kept.
#[derive(Clone)]
pub struct SharedVariables {
    host: Host,
    text_read_limit: usize,
    registry: Rc<OnceCell<VariableRegistry>>,
}

impl SharedVariables {
    fn new(host: Host, text_read_limit: usize) -> Self {
        Self {
            host,
            text_read_limit,
            registry: Rc::new(OnceCell::new()),
        }
    }

    pub fn get(&self) -> &VariableRegistry {
        self.registry.get_or_init(|| {
            VariableRegistry::standard_with_read_limit(self.host, self.text_read_limit)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.registry.get().is_some()
    }
}

/// Everything the plug-in owns between `PluginInitialize` and unload.
pub struct Plugin {
    host: Host,
    config: PluginConfig,
    dispatcher: CallbackDispatcher,
    events: Rc<RefCell<HostEvents>>,
    variables: SharedVariables,
}

impl Plugin {
    /// Register the sample actions and attach the standard event handlers.
    pub fn new(host: Host, config: PluginConfig) -> Self {
        let plugin = Self {
            host,
            dispatcher: CallbackDispatcher::new(),
            events: Rc::new(RefCell::new(HostEvents::new(host))),
            variables: SharedVariables::new(host, config.text_read_limit),
            config,
        };
        plugin.register_actions();
        plugin.attach_event_handlers();
        tracing::info!(actions = plugin.dispatcher.action_count(), "sample plug-in ready");
        plugin
    }

    pub fn host(&self) -> Host {
        self.host
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &CallbackDispatcher {
        &self.dispatcher
    }

    pub fn events(&self) -> Ref<'_, HostEvents> {
        self.events.borrow()
    }

    pub fn variables(&self) -> &SharedVariables {
        &self.variables
    }

    fn register_actions(&self) {
        let host = self.host;
        self.dispatcher.set_action(ACTION_START_LIVE, move || {
            log_failure("start live", start_live_if_idle(host));
        });

        let variables = self.variables.clone();
        self.dispatcher.set_action(ACTION_CONCAT_ARGS, move || {
            log_failure("concatenate arguments", concat_args(variables.get()));
        });
    }

    fn attach_event_handlers(&self) {
        let mut events = self.events.borrow_mut();

        if self.config.log_standard_events {
            add_logger_to_event(events.application_closing(), "Application closing");
            add_logger_to_event(events.camera_initialized(), "Camera initialized");
            add_logger_to_event(events.image_doc_changed(), "Image document changed");
        }

        let variables = self.variables.clone();
        let backup_name = self.config.backup_file_name.clone();
        events
            .application_closing()
            .add_delegate(make_event_delegate(move |_: &mut usize| {
                log_failure("back up variables", backup_variables(variables.get(), &backup_name));
            }));

        if self.config.idle_notification_limit > 0 {
            let limiter =
                IdleLimiter::new(self.config.idle_notification_limit, Rc::downgrade(&self.events));
            events.idle().add_delegate(Rc::new(limiter));
        }
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        tracing::info!("sample plug-in shutting down");
    }
}

fn log_failure(what: &str, outcome: Result<()>) {
    if let Err(err) = outcome {
        tracing::warn!(error = %err, "{what} failed");
    }
}

fn start_live_if_idle(host: Host) -> Result<()> {
    if access::get_bool_variable(&host, "LiveImgRunning")? {
        tracing::debug!("live view already running");
        return Ok(());
    }
    host.start_live()
}

fn concat_args(registry: &VariableRegistry) -> Result<()> {
    let text = |name: &str| -> Result<String> {
        registry
            .lookup_as::<TextVariable>(name)
            .ok_or_else(|| InteropError::NotFound(name.to_string()))?
            .value()
    };
    let count = registry
        .lookup_as::<IntegerVariable>("LiveImgCount")
        .ok_or_else(|| InteropError::NotFound("LiveImgCount".to_string()))?
        .format_value()?;

    let combined = format!("{}{}{}", text("_argT1")?, text("_argT2")?, count);
    registry.set_value("_argT3", Value::Text(combined))
}

/// Save every standard variable to `<PrefsFilePath>/<backup_name>`.
pub fn backup_variables(registry: &VariableRegistry, backup_name: &str) -> Result<()> {
    let prefs = registry
        .lookup_as::<TextVariable>("PrefsFilePath")
        .ok_or_else(|| InteropError::NotFound("PrefsFilePath".to_string()))?
        .value()?;
    let target = backup_path(&prefs, backup_name);
    tracing::info!(path = %target, "backing up variables");
    registry.save_all(&target)
}

pub fn backup_path(prefs_dir: &str, backup_name: &str) -> String {
    Path::new(prefs_dir).join(backup_name).to_string_lossy().into_owned()
}

/// Counts idle notifications and unbinds the idle source once `limit` is reached.
struct IdleLimiter {
    remaining: Cell<u32>,
    events: Weak<RefCell<HostEvents>>,
}

impl IdleLimiter {
    fn new(limit: u32, events: Weak<RefCell<HostEvents>>) -> Self {
        Self {
            remaining: Cell::new(limit),
            events,
        }
    }
}

impl Delegate<usize> for IdleLimiter {
    fn invoke(&self, _arg: &mut usize) {
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        tracing::debug!(remaining, "host idle");
        if remaining > 0 {
            return;
        }

        let Some(events) = self.events.upgrade() else {
            return;
        };
        // Dispatch reaches the source through its token, not through this
        // RefCell, so a shared borrow is free here.
        let events = events.borrow();
        if let Some(idle) = events.existing_idle() {
            idle.disable();
            tracing::info!("idle notification limit reached; idle listener unbound");
        }
    }
}
