#![forbid(unsafe_code)]

//! Scope guards and event delivery shared by the data sources.
//!
//! [`SilenceGuard`] disables an observer set for its lifetime and re-enables
//! it on drop, so a panicking body cannot leave delivery switched off.
//! [`ScopedFlag`] does the same for a boolean such as a reentrancy guard.

use std::cell::Cell;

use sectioned_core::{Event, ObserverSet, SourceConfig};
use tracing::trace;

/// Suppresses delivery on an observer set until dropped.
#[must_use = "delivery is re-enabled as soon as the guard is dropped"]
pub struct SilenceGuard<'a> {
    observers: &'a ObserverSet<Event>,
}

impl<'a> SilenceGuard<'a> {
    pub fn new(observers: &'a ObserverSet<Event>) -> Self {
        observers.disable();
        Self { observers }
    }
}

impl Drop for SilenceGuard<'_> {
    fn drop(&mut self) {
        self.observers.enable();
    }
}

/// Holds a flag raised until dropped.
#[must_use = "the flag is lowered as soon as the guard is dropped"]
pub struct ScopedFlag<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ScopedFlag<'a> {
    pub fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for ScopedFlag<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Deliver `event`, logging it when the source traces events.
pub(crate) fn broadcast(observers: &ObserverSet<Event>, config: &SourceConfig, event: &Event) {
    let delivered = observers.send(event);
    if config.trace_events() {
        trace!(source = config.label(), ?event, delivered, "event delivered");
    }
}
