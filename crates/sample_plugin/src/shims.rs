// crates/sample_plugin/src/shims.rs

use std::panic::{self, AssertUnwindSafe};

use spot_interop::Host;
use spot_shared::{callback_reason, CallbackFn, CallbackReason, HostActionFn};

use crate::config::PluginConfig;
use crate::logging::init_logging;
use crate::state::Plugin;

fn catch_ffi_panic<F>(f: F) -> bool
where
    F: FnOnce() -> bool,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(_) => {
            tracing::error!("panic during plug-in initialisation; refusing to load");
            false
        }
    }
}

/// Entry point the host resolves by name when it loads the library.
///
/// # Safety
/// Called by the host with a valid action function and writable out-pointers.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn PluginInitialize(
    host_action_fn: HostActionFn,
    plugin_handle: usize,
    _info: usize,
    out_callback: *mut Option<CallbackFn>,
    out_user_data: *mut usize,
) -> bool {
    catch_ffi_panic(|| {
        let config = PluginConfig::load();
        init_logging(&config.log_filter);
        install(host_action_fn, plugin_handle, out_callback, out_user_data, config)
    })
}

/// Build the [`Plugin`] and hand its callback and token to the host.
///
/// # Safety
/// Same contract as [`PluginInitialize`].
pub unsafe fn install(
    host_action_fn: HostActionFn,
    plugin_handle: usize,
    out_callback: *mut Option<CallbackFn>,
    out_user_data: *mut usize,
    config: PluginConfig,
) -> bool {
    if out_callback.is_null() || out_user_data.is_null() {
        tracing::error!("host passed null callback slots");
        return false;
    }

    let host = Host::new(host_action_fn, plugin_handle);
    let plugin = Box::new(Plugin::new(host, config));
    *out_callback = Some(plugin_callback);
    *out_user_data = Box::into_raw(plugin) as usize;
    true
}

/// Host callback. The user data is the `Box<Plugin>` leaked by [`install`],
/// reclaimed here on unload.
unsafe extern "system" fn plugin_callback(reason: CallbackReason, info: usize, user_data: usize) {
    if user_data == 0 {
        return;
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if reason == callback_reason::UNLOADING_PLUGIN {
            let plugin = Box::from_raw(user_data as *mut Plugin);
            plugin.dispatcher().handle(reason, info);
            drop(plugin);
        } else {
            let plugin = &*(user_data as *const Plugin);
            plugin.dispatcher().handle(reason, info);
        }
    }));
    if outcome.is_err() {
        tracing::error!(reason, info, "plug-in callback panicked; aborting");
        std::process::abort();
    }
}
