// crates/spot_interop/src/lib.rs
//! Plug-in side of the Spot host interface.
//!
//! Wraps the host's single action function and its event/callback protocol in
//! typed Rust: event sources with multicast delegates, typed variable handles,
//! a named variable registry, and an action-code dispatcher. Everything here is
//! driven from the host thread and is deliberately `!Send`.

pub mod delegate;
pub mod dispatcher;
pub mod error;
pub mod event_source;
pub mod host;
pub mod host_events;
pub mod logger;
pub mod transform;
pub mod util;
pub mod variables;

#[cfg(test)]
mod test_support;

pub use delegate::{make_event_delegate, Delegate, DelegateRef, FnDelegate, MulticastDelegate};
pub use dispatcher::{master_callback, CallbackDispatcher};
pub use error::{BatchFailure, InteropError, Result};
pub use event_source::{
    EventSource, IntegerEvent, NullEvent, RawEvent, ReadStringEvent, StringEvent, WriteStringEvent,
};
pub use host::Host;
pub use host_events::HostEvents;
pub use logger::{add_logger_to_event, EventLogger};
pub use transform::{
    host_str, ArgTransform, CStrMut, CStrRef, CastTo, FromRawArg, NoOp, OwnedString,
};
pub use util::round_away_from_zero;
pub use variables::{
    BoolVariable, IntegerVariable, NumericVariable, Scope, TextVariable, TypedVariable, Value,
    Variable, VariableRegistry, VariableType,
};
