// crates/spot_interop/src/logger.rs

use std::fmt::Debug;
use std::rc::Rc;

use crate::delegate::Delegate;
use crate::event_source::EventSource;
use crate::transform::ArgTransform;

/// Delegate that records every notification it sees.
pub struct EventLogger {
    name: String,
}

impl EventLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<T: Debug> Delegate<T> for EventLogger {
    fn invoke(&self, arg: &mut T) {
        tracing::info!(target: "spot::events", event = %self.name, args = ?arg, "host event");
    }
}

/// Attach an [`EventLogger`] named `event_name` to `source`.
pub fn add_logger_to_event<F>(source: &EventSource<F>, event_name: &str)
where
    F: ArgTransform,
    F::Output: Debug,
{
    source.add_delegate(Rc::new(EventLogger::new(event_name)));
}
