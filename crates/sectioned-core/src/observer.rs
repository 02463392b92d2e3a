#![forbid(unsafe_code)]

//! Broadcast of values to registered handlers, with suppressible delivery.
//!
//! # Design
//!
//! [`ObserverSet<T>`] keeps handlers as `Weak` function pointers. The strong
//! reference lives in the [`Subscription`] returned by
//! [`subscribe`](ObserverSet::subscribe), so dropping (or disposing) the
//! subscription unregisters the handler. Dead entries are pruned lazily on
//! the next delivery.
//!
//! Delivery can be suppressed with a reference-counted
//! [`disable`](ObserverSet::disable) / [`enable`](ObserverSet::enable) pair.
//! The set is single-threaded like the `Rc` handles that own it, so the
//! counter is a plain `Cell`.
//!
//! # Invariants
//!
//! 1. Handlers run synchronously, in registration order.
//! 2. A handler registered when `send` starts is called even if its
//!    subscription is dropped by an earlier handler during that delivery.
//! 3. While the disable counter is nonzero, `send` delivers nothing.
//! 4. Enabling past zero is a contract violation and panics.
//! 5. No internal borrow is held while a handler runs, so handlers may
//!    subscribe, unsubscribe, or send re-entrantly.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ContractViolation, violation};

type Handler<T> = dyn Fn(&T);

/// Ordered set of handlers receiving values of type `T`.
pub struct ObserverSet<T> {
    handlers: RefCell<Vec<Weak<Handler<T>>>>,
    disabled: Cell<usize>,
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObserverSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("handlers", &self.len())
            .field("disabled", &self.disabled.get())
            .finish()
    }
}

impl<T> ObserverSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            disabled: Cell::new(0),
        }
    }

    /// Number of live handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `send` currently delivers.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.disabled.get() == 0
    }

    /// Suppress delivery until a matching [`enable`](Self::enable).
    pub fn disable(&self) {
        self.disabled.set(self.disabled.get() + 1);
    }

    /// Undo one [`disable`](Self::disable).
    ///
    /// # Panics
    ///
    /// Panics if the set is not disabled.
    pub fn enable(&self) {
        match self.disabled.get().checked_sub(1) {
            Some(count) => self.disabled.set(count),
            None => violation(ContractViolation::EnableUnderflow),
        }
    }

    /// Deliver `value` to every live handler, unless disabled.
    ///
    /// Returns the number of handlers that received it.
    pub fn send(&self, value: &T) -> usize {
        if !self.enabled() {
            return 0;
        }

        let live: Vec<Rc<Handler<T>>> = {
            let mut handlers = self.handlers.borrow_mut();
            handlers.retain(|weak| weak.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };

        for handler in &live {
            handler(value);
        }
        live.len()
    }
}

impl<T: 'static> ObserverSet<T> {
    /// Register `handler`. It stays registered while the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Handler<T>> = Rc::new(handler);
        self.handlers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _handler: Box::new(strong),
        }
    }
}

/// RAII registration of a handler in an [`ObserverSet`].
///
/// Dropping the subscription, or calling [`dispose`](Self::dispose),
/// unregisters the handler before the next delivery.
#[must_use = "dropping the subscription unregisters the handler"]
pub struct Subscription {
    _handler: Box<dyn Any>,
}

impl Subscription {
    /// Unregister now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
