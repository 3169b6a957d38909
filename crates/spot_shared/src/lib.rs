// crates/spot_shared/src/lib.rs

pub mod plugin_api;

pub use plugin_api::{
    callback_reason, host_action, host_event, CallbackFn, CallbackReason, EventHandlerBinding,
    EventHandlerFn, GetSetVariable, HostAction, HostActionFn, HostEvent, InitFn, SaveRecallVariable,
    TextValue, VariableDataType, VariablePayload, PLUGIN_INIT_SYMBOL,
};
