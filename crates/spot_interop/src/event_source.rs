// crates/spot_interop/src/event_source.rs
//! Typed, multicast listeners for host events.
//!
//! The host stores one `(trampoline, token)` pair per binding and calls it back
//! with a raw word. An [`EventSource`] owns that binding: the trampoline is
//! monomorphized per transform, the token is the address of the source's
//! heap-allocated binding cell, and dispatch runs the transform and then the
//! delegate chain.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use spot_shared::{EventHandlerFn, HostEvent};

use crate::delegate::{Delegate, DelegateRef, MulticastDelegate};
use crate::host::Host;
use crate::transform::{ArgTransform, CStrMut, CStrRef, CastTo, NoOp, OwnedString};

/// The original value passed from the host.
pub type RawEvent = EventSource<NoOp>;
/// The event has no usable argument.
pub type NullEvent = RawEvent;
/// The argument is an integer.
pub type IntegerEvent = EventSource<CastTo<i32>>;
/// The argument points to a writable char buffer.
pub type WriteStringEvent = EventSource<CStrMut>;
/// The argument points to a read-only C string.
pub type ReadStringEvent = EventSource<CStrRef>;
/// The argument is copied into an owned `String`.
pub type StringEvent = EventSource<OwnedString>;

// The host keeps a pointer to this; it must not move while bound. Dispatch
// holds its own strong count, so a delegate may drop or replace the owning
// EventSource without freeing the cell under the running trampoline.
struct BindingCell<F: ArgTransform> {
    host: Host,
    target_event: HostEvent,
    transform: F,
    delegate: RefCell<MulticastDelegate<F::Output>>,
    enabled: Cell<bool>,
}

impl<F: ArgTransform> BindingCell<F> {
    fn handle_event(&self, raw: usize) {
        // SAFETY: the source was built for `target_event`, whose host contract
        // guarantees the provenance this transform requires.
        let mut arg = unsafe { self.transform.transform(raw) };
        // Snapshot so delegates may add/remove delegates (or rebind) mid-dispatch.
        let chain = self.delegate.borrow().clone();
        chain.invoke(&mut arg);
    }
}

unsafe extern "system" fn dispatch_to_owner<F: ArgTransform>(
    event: HostEvent,
    args: usize,
    source: usize,
) {
    let ptr = source as *const BindingCell<F>;
    // The token is `Rc::as_ptr` of a cell the source still owns while bound.
    Rc::increment_strong_count(ptr);
    let cell = Rc::from_raw(ptr);
    tracing::trace!(event, args, "dispatching host event");

    // Unwinding into the host is undefined behaviour.
    if panic::catch_unwind(AssertUnwindSafe(|| cell.handle_event(args))).is_err() {
        tracing::error!(event, "event delegate panicked during host dispatch; aborting");
        std::process::abort();
    }
}

/// Binds one host event to a typed delegate chain.
///
/// Created enabled. Dropping it unbinds. Not `Clone`: the host can only call one
/// trampoline per token, so two copies would alias one binding with two chains.
pub struct EventSource<F: ArgTransform> {
    cell: Rc<BindingCell<F>>,
}

impl<F: ArgTransform> EventSource<F> {
    /// Create the source and bind it immediately. Check
    /// [`listening`](Self::listening) to see whether the host accepted the binding.
    pub fn new(host: Host, event: HostEvent, transform: F) -> Self {
        let source = Self::new_disabled(host, event, transform);
        source.enable();
        source
    }

    pub fn new_disabled(host: Host, event: HostEvent, transform: F) -> Self {
        Self {
            cell: Rc::new(BindingCell {
                host,
                target_event: event,
                transform,
                delegate: RefCell::new(MulticastDelegate::new()),
                enabled: Cell::new(false),
            }),
        }
    }

    pub fn event(&self) -> HostEvent {
        self.cell.target_event
    }

    /// The user-data word the host hands back to the trampoline.
    pub fn token(&self) -> usize {
        Rc::as_ptr(&self.cell) as usize
    }

    pub fn listening(&self) -> bool {
        self.cell.enabled.get()
    }

    /// Register with the host. A rejected bind leaves the source disabled.
    pub fn enable(&self) -> bool {
        let mut events = [self.cell.target_event];
        let handler: EventHandlerFn = dispatch_to_owner::<F>;
        let bound = self.cell.host.bind_events(&mut events, handler, self.token());
        self.cell.enabled.set(bound);

        if bound {
            tracing::debug!(
                event = self.cell.target_event,
                token = self.token(),
                "event source bound"
            );
        } else {
            tracing::warn!(event = self.cell.target_event, "host refused event binding");
        }
        bound
    }

    /// Unregister from the host. Does nothing (and sends nothing) when not bound.
    pub fn disable(&self) {
        if !self.cell.enabled.get() {
            return;
        }
        let mut events = [self.cell.target_event];
        if !self.cell.host.unbind_events(&mut events, self.token()) {
            tracing::warn!(
                event = self.cell.target_event,
                "host reported failure unbinding event"
            );
        }
        self.cell.enabled.set(false);
        tracing::debug!(event = self.cell.target_event, "event source unbound");
    }

    pub fn add_delegate(&self, delegate: DelegateRef<F::Output>) {
        self.cell.delegate.borrow_mut().add(delegate);
    }

    pub fn remove_delegate(&self, delegate: &DelegateRef<F::Output>) -> bool {
        self.cell.delegate.borrow_mut().remove(delegate)
    }

    pub fn remove_delegate_ref(&self, delegate: &dyn Delegate<F::Output>) -> bool {
        self.cell.delegate.borrow_mut().remove_ref(delegate)
    }

    pub fn remove_all_delegates(&self) {
        self.cell.delegate.borrow_mut().remove_all();
    }

    pub fn delegate_count(&self) -> usize {
        self.cell.delegate.borrow().len()
    }

    /// Move this source's delegates and binding into a new source.
    ///
    /// The host token names the binding cell, so it cannot follow the delegates
    /// on its own: if this source was bound it is unbound here and the new one
    /// binds with its own token. `self` is left disabled with an empty chain.
    pub fn transfer(&mut self) -> Self
    where
        F: Clone,
    {
        let was_enabled = self.listening();
        self.disable();

        let delegate = self.cell.delegate.take();
        let moved = Self {
            cell: Rc::new(BindingCell {
                host: self.cell.host,
                target_event: self.cell.target_event,
                transform: self.cell.transform.clone(),
                delegate: RefCell::new(delegate),
                enabled: Cell::new(false),
            }),
        };
        if was_enabled {
            moved.enable();
        }
        moved
    }

    /// Replace this source with the contents of `other`, releasing whatever this
    /// source was bound to first.
    ///
    /// May be called from one of this source's own delegates: the cell being
    /// dispatched stays alive until the trampoline returns.
    pub fn take_from(&mut self, other: &mut Self)
    where
        F: Clone,
    {
        self.disable();
        *self = other.transfer();
    }
}

impl<F: ArgTransform + Default> EventSource<F> {
    pub fn with_default_transform(host: Host, event: HostEvent) -> Self {
        Self::new(host, event, F::default())
    }
}

impl<F: ArgTransform> Drop for EventSource<F> {
    fn drop(&mut self) {
        self.disable();
    }
}

impl<F: ArgTransform> fmt::Debug for EventSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("event", &self.cell.target_event)
            .field("listening", &self.listening())
            .field("delegates", &self.delegate_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::make_event_delegate;
    use crate::test_support::host_for;
    use spot_shared::{host_action, host_event};
    use spot_testhost::MockHost;

    #[test]
    fn binds_on_construction_and_unbinds_once_on_drop() {
        let mock = MockHost::new();
        let source = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);
        assert!(source.listening());
        assert_eq!(mock.calls(host_action::BIND_EVENT_HANDLER), 1);
        assert_eq!(mock.bound_count(host_event::IDLE), 1);

        source.disable();
        source.disable();
        drop(source);
        assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 1);
        assert_eq!(mock.bound_count(host_event::IDLE), 0);
    }

    #[test]
    fn rejected_bind_stays_disabled_and_never_unbinds() {
        let mock = MockHost::new();
        mock.reject_action(host_action::BIND_EVENT_HANDLER);

        let source = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);
        assert!(!source.listening());
        drop(source);
        assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 0);
    }

    #[test]
    fn starts_disabled_until_enabled() {
        let mock = MockHost::new();
        let source = RawEvent::new_disabled(host_for(&mock), host_event::IDLE, NoOp);
        assert!(!source.listening());
        assert_eq!(mock.calls(host_action::BIND_EVENT_HANDLER), 0);

        assert!(source.enable());
        assert!(source.listening());
    }

    #[test]
    fn dispatch_transforms_and_fans_out_in_order() {
        let mock = MockHost::new();
        let source =
            IntegerEvent::new(host_for(&mock), host_event::IMAGE_DOC_CHANGED, CastTo::default());
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            source.add_delegate(make_event_delegate(move |arg: &mut i32| {
                seen.borrow_mut().push((tag, *arg))
            }));
        }

        mock.fire(host_event::IMAGE_DOC_CHANGED, 42);
        assert_eq!(*seen.borrow(), vec![("first", 42), ("second", 42)]);

        mock.fire(host_event::IDLE, 7);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn owned_string_event_copies_host_text() {
        let mock = MockHost::new();
        let source =
            StringEvent::with_default_transform(host_for(&mock), host_event::CAMERA_INITIALIZED);
        let seen = Rc::new(std::cell::RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        source.add_delegate(make_event_delegate(move |name: &mut String| {
            *sink.borrow_mut() = name.clone()
        }));

        let camera = b"Spot RT3\0";
        mock.fire(host_event::CAMERA_INITIALIZED, camera.as_ptr() as usize);
        assert_eq!(*seen.borrow(), "Spot RT3");
    }

    #[test]
    fn removed_delegate_stops_receiving() {
        let mock = MockHost::new();
        let source = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let delegate = make_event_delegate(move |_: &mut usize| counter.set(counter.get() + 1));
        source.add_delegate(Rc::clone(&delegate));

        mock.fire(host_event::IDLE, 0);
        assert!(source.remove_delegate(&delegate));
        mock.fire(host_event::IDLE, 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(source.delegate_count(), 0);
    }

    #[test]
    fn transfer_rebinds_with_the_new_token() {
        let mock = MockHost::new();
        let mut original = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        original.add_delegate(make_event_delegate(move |_: &mut usize| {
            counter.set(counter.get() + 1)
        }));
        let old_token = original.token();

        let moved = original.transfer();
        assert!(!original.listening());
        assert_eq!(original.delegate_count(), 0);
        assert!(moved.listening());
        assert_ne!(moved.token(), old_token);
        assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 1);
        assert_eq!(mock.bound_count(host_event::IDLE), 1);

        mock.fire(host_event::IDLE, 0);
        assert_eq!(hits.get(), 1);

        drop(original);
        assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 1);
    }

    #[test]
    fn take_from_releases_previous_binding() {
        let mock = MockHost::new();
        let mut target = RawEvent::new(host_for(&mock), host_event::APPLICATION_CLOSING, NoOp);
        let mut other = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);

        target.take_from(&mut other);
        assert_eq!(target.event(), host_event::IDLE);
        assert!(target.listening());
        assert!(!other.listening());
        assert_eq!(mock.bound_count(host_event::APPLICATION_CLOSING), 0);
        assert_eq!(mock.bound_count(host_event::IDLE), 1);
    }

    #[test]
    fn plain_moves_keep_the_binding_valid() {
        let mock = MockHost::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let source = RawEvent::new(host_for(&mock), host_event::IDLE, NoOp);
        source.add_delegate(make_event_delegate(move |_: &mut usize| {
            counter.set(counter.get() + 1)
        }));

        let holder = vec![source];
        mock.fire(host_event::IDLE, 0);
        assert_eq!(hits.get(), 1);
        drop(holder);
        assert_eq!(mock.bound_count(host_event::IDLE), 0);
    }

    #[test]
    fn delegate_can_disable_its_own_source_mid_dispatch() {
        let mock = MockHost::new();
        let source = Rc::new(RawEvent::new(host_for(&mock), host_event::IDLE, NoOp));
        let weak = Rc::downgrade(&source);
        source.add_delegate(make_event_delegate(move |_: &mut usize| {
            if let Some(source) = weak.upgrade() {
                source.disable();
            }
        }));

        mock.fire(host_event::IDLE, 0);
        assert!(!source.listening());
        mock.fire(host_event::IDLE, 0);
        assert_eq!(mock.calls(host_action::UNBIND_EVENT_HANDLER), 1);
    }

    #[test]
    fn delegate_can_replace_its_own_source_mid_dispatch() {
        let mock = MockHost::new();
        let host = host_for(&mock);
        let slot = Rc::new(RefCell::new(RawEvent::new(host, host_event::IDLE, NoOp)));
        let replacement = RefCell::new(Some(RawEvent::new(
            host,
            host_event::APPLICATION_CLOSING,
            NoOp,
        )));
        let weak = Rc::downgrade(&slot);
        slot.borrow().add_delegate(make_event_delegate(move |_: &mut usize| {
            let next = replacement.borrow_mut().take();
            if let (Some(slot), Some(mut next)) = (weak.upgrade(), next) {
                slot.borrow_mut().take_from(&mut next);
            }
        }));

        mock.fire(host_event::IDLE, 0);

        let source = slot.borrow();
        assert_eq!(source.event(), host_event::APPLICATION_CLOSING);
        assert!(source.listening());
        assert_eq!(mock.bound_count(host_event::IDLE), 0);
        assert_eq!(mock.bound_count(host_event::APPLICATION_CLOSING), 1);
    }
}
