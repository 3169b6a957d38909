// crates/sample_plugin/tests/plugin_lifecycle.rs

use std::ptr;

use sample_plugin::{
    backup_path, install, PluginConfig, PluginInitialize, ACTION_CONCAT_ARGS, ACTION_START_LIVE,
};
use spot_shared::{host_action, host_event, CallbackFn, HostActionFn};
use spot_testhost::{MockHost, StoredValue};

fn quiet_config(idle_notification_limit: u32) -> PluginConfig {
    PluginConfig {
        log_standard_events: false,
        idle_notification_limit,
        ..PluginConfig::default()
    }
}

unsafe extern "system" fn init_quiet(
    action_fn: HostActionFn,
    handle: usize,
    _info: usize,
    out_callback: *mut Option<CallbackFn>,
    out_user_data: *mut usize,
) -> bool {
    install(action_fn, handle, out_callback, out_user_data, quiet_config(3))
}

unsafe extern "system" fn init_without_idle(
    action_fn: HostActionFn,
    handle: usize,
    _info: usize,
    out_callback: *mut Option<CallbackFn>,
    out_user_data: *mut usize,
) -> bool {
    install(action_fn, handle, out_callback, out_user_data, quiet_config(0))
}

fn loaded_quiet() -> MockHost {
    let mock = MockHost::new();
    assert!(unsafe { mock.load(init_quiet) });
    mock
}

#[test]
fn initialize_binds_standard_events_and_unload_releases_them() {
    let mock = MockHost::new();
    assert!(unsafe { mock.load(PluginInitialize) });
    assert!(mock.has_callback());

    for event in [
        host_event::IDLE,
        host_event::APPLICATION_CLOSING,
        host_event::IMAGE_DOC_CHANGED,
        host_event::CAMERA_INITIALIZED,
    ] {
        assert_eq!(mock.bound_count(event), 1, "event {event} not bound");
    }
    assert_eq!(mock.calls(host_action::GET_VARIABLE), 0);

    assert!(mock.unload());
    for event in [
        host_event::IDLE,
        host_event::APPLICATION_CLOSING,
        host_event::IMAGE_DOC_CHANGED,
        host_event::CAMERA_INITIALIZED,
    ] {
        assert_eq!(mock.bound_count(event), 0, "event {event} still bound");
    }
    assert!(!mock.send_action_code(ACTION_START_LIVE));
}

#[test]
fn start_live_action_respects_running_state() {
    let mock = loaded_quiet();
    mock.set_variable("LiveImgRunning", StoredValue::Bool(false));

    assert!(mock.send_action_code(ACTION_START_LIVE));
    assert_eq!(mock.calls(host_action::START_LIVE), 1);

    mock.set_variable("LiveImgRunning", StoredValue::Bool(true));
    mock.send_action_code(ACTION_START_LIVE);
    assert_eq!(mock.calls(host_action::START_LIVE), 1);
}

#[test]
fn start_live_action_does_nothing_when_state_is_unknown() {
    let mock = loaded_quiet();
    mock.send_action_code(ACTION_START_LIVE);
    assert_eq!(mock.calls(host_action::GET_VARIABLE), 1);
    assert_eq!(mock.calls(host_action::START_LIVE), 0);
}

#[test]
fn concat_action_writes_third_argument() {
    let mock = loaded_quiet();
    mock.set_variable("_argT1", StoredValue::Text("slide-".into()));
    mock.set_variable("_argT2", StoredValue::Text("frame-".into()));
    mock.set_variable("_argT3", StoredValue::Text(String::new()));
    mock.set_variable("LiveImgCount", StoredValue::Numeric(41.6));

    mock.send_action_code(ACTION_CONCAT_ARGS);
    assert_eq!(mock.variable("_argT3"), Some(StoredValue::Text("slide-frame-42".into())));
}

#[test]
fn concat_action_is_skipped_when_inputs_are_missing() {
    let mock = loaded_quiet();
    mock.set_variable("_argT1", StoredValue::Text("a".into()));
    mock.set_variable("_argT3", StoredValue::Text("untouched".into()));

    mock.send_action_code(ACTION_CONCAT_ARGS);
    assert_eq!(mock.variable("_argT3"), Some(StoredValue::Text("untouched".into())));
    assert_eq!(mock.calls(host_action::SET_VARIABLE), 0);
}

#[test]
fn unregistered_action_code_is_ignored() {
    let mock = loaded_quiet();
    assert!(mock.send_action_code(99));
    assert_eq!(mock.requests().len(), mock.calls(host_action::BIND_EVENT_HANDLER));
}

#[test]
fn application_closing_backs_up_standard_variables() {
    let mock = loaded_quiet();
    mock.set_variable("PrefsFilePath", StoredValue::Text("C:/prefs".into()));
    mock.set_variable("_argT1", StoredValue::Text("kept".into()));
    mock.set_variable("LiveImgRunning", StoredValue::Bool(true));

    mock.fire(host_event::APPLICATION_CLOSING, 0);

    let target = backup_path("C:/prefs", "BackupVars");
    assert_eq!(mock.saved_value(&target, "_argT1"), Some(StoredValue::Text("kept".into())));
    assert_eq!(mock.saved_value(&target, "LiveImgRunning"), Some(StoredValue::Bool(true)));
    assert_eq!(mock.calls(host_action::SAVE_VARIABLE), 3);
}

#[test]
fn backup_is_skipped_without_preferences_folder() {
    let mock = loaded_quiet();
    mock.set_variable("_argT1", StoredValue::Text("kept".into()));

    mock.fire(host_event::APPLICATION_CLOSING, 0);
    assert_eq!(mock.calls(host_action::SAVE_VARIABLE), 0);
}

#[test]
fn idle_listener_unbinds_after_its_limit() {
    let mock = loaded_quiet();
    assert_eq!(mock.bound_count(host_event::IDLE), 1);

    for _ in 0..3 {
        mock.fire(host_event::IDLE, 0);
    }
    assert_eq!(mock.bound_count(host_event::IDLE), 0);
    assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 1);

    mock.fire(host_event::IDLE, 0);
    assert!(mock.unload());
    assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 2);
}

#[test]
fn zero_idle_limit_never_binds_idle() {
    let mock = MockHost::new();
    assert!(unsafe { mock.load(init_without_idle) });
    assert_eq!(mock.bound_count(host_event::IDLE), 0);
    assert_eq!(mock.bound_count(host_event::APPLICATION_CLOSING), 1);
}

#[test]
fn null_out_pointers_refuse_to_load() {
    let mock = MockHost::new();
    let mut user_data = 0usize;
    let accepted = unsafe {
        install(
            mock.action_fn(),
            mock.plugin_handle(),
            ptr::null_mut(),
            &mut user_data,
            PluginConfig::default(),
        )
    };
    assert!(!accepted);
    assert_eq!(mock.requests().len(), 0);
}
