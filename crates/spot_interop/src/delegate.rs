// crates/spot_interop/src/delegate.rs

use std::fmt;
use std::rc::Rc;

/// A handler for one typed event argument.
///
/// Handlers get the argument by `&mut` so delegates over writable transforms can
/// edit the host buffer; later delegates in a chain see those edits. State that
/// changes across calls goes behind `Cell`/`RefCell` in the implementor.
pub trait Delegate<T> {
    fn invoke(&self, arg: &mut T);
}

/// Shared handle to a registered delegate. Removal by handle compares identity.
pub type DelegateRef<T> = Rc<dyn Delegate<T>>;

/// Adapts a closure into a [`Delegate`].
pub struct FnDelegate<F>(F);

impl<T, F> Delegate<T> for FnDelegate<F>
where
    F: Fn(&mut T),
{
    fn invoke(&self, arg: &mut T) {
        (self.0)(arg)
    }
}

/// Box a closure as a shareable delegate, ready for `add_delegate`.
pub fn make_event_delegate<T, F>(f: F) -> DelegateRef<T>
where
    T: 'static,
    F: Fn(&mut T) + 'static,
{
    Rc::new(FnDelegate(f))
}

/// Fans one invocation out to every registered delegate, in registration order.
pub struct MulticastDelegate<T> {
    delegates: Vec<DelegateRef<T>>,
}

impl<T> MulticastDelegate<T> {
    pub fn new() -> Self {
        Self { delegates: Vec::new() }
    }

    pub fn add(&mut self, delegate: DelegateRef<T>) {
        self.delegates.push(delegate);
    }

    /// Remove the first entry that is the same allocation as `delegate`.
    /// Returns false (and changes nothing) if it was never added.
    pub fn remove(&mut self, delegate: &DelegateRef<T>) -> bool {
        let target = Rc::as_ptr(delegate) as *const ();
        self.remove_where(|item| Rc::as_ptr(item) as *const () == target)
    }

    /// Remove the first entry whose delegate lives at the address of `delegate`.
    pub fn remove_ref(&mut self, delegate: &dyn Delegate<T>) -> bool {
        let target = delegate as *const dyn Delegate<T> as *const ();
        self.remove_where(|item| Rc::as_ptr(item) as *const () == target)
    }

    fn remove_where(&mut self, pred: impl Fn(&DelegateRef<T>) -> bool) -> bool {
        match self.delegates.iter().position(pred) {
            Some(index) => {
                self.delegates.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_all(&mut self) {
        self.delegates.clear();
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

impl<T> Default for MulticastDelegate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MulticastDelegate<T> {
    fn clone(&self) -> Self {
        Self {
            delegates: self.delegates.clone(),
        }
    }
}

impl<T> Delegate<T> for MulticastDelegate<T> {
    fn invoke(&self, arg: &mut T) {
        for delegate in &self.delegates {
            delegate.invoke(arg);
        }
    }
}

impl<T> fmt::Debug for MulticastDelegate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("len", &self.delegates.len())
            .finish()
    }
}
