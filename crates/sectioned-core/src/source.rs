#![forbid(unsafe_code)]

//! The data-source capability.
//!
//! A [`DataSource`] is an ordered list of sections reachable by index, with
//! point lookup by [`IndexPath`] and an observation point that broadcasts an
//! [`Event`] for every change. Implementations are shared handles: reads go
//! through `&self`, and state lives behind interior mutability.
//!
//! # Read contract
//!
//! While an event is being delivered, `sections_count` and
//! `number_of_objects` already reflect the change it describes. Inside a
//! batch only `DidEndUpdate` guarantees that every buffered event has been
//! applied; consumers that reconcile against counts buffer until then.
//!
//! # Chaining
//!
//! The trait is object safe. Derived sources hold their origin as
//! `Rc<dyn DataSource<Object = _>>`, so any source, derived or not, can feed
//! another one.

use crate::error::{ContractViolation, Result};
use crate::event::Event;
use crate::index_path::IndexPath;
use crate::observer::{ObserverSet, Subscription};
use crate::section::SectionInfo;

pub trait DataSource {
    type Object;

    /// Observer set events are broadcast through.
    fn observers(&self) -> &ObserverSet<Event>;

    fn sections_count(&self) -> usize;

    /// Metadata snapshot of the section at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn section_at(&self, index: usize) -> SectionInfo;

    /// # Panics
    ///
    /// Panics if `section` is out of bounds.
    fn number_of_objects(&self, section: usize) -> usize;

    /// # Panics
    ///
    /// Panics if `index_path` does not address an existing object.
    fn object_at(&self, index_path: IndexPath) -> Self::Object;

    /// Mark state stale without recomputing it and emit [`Event::Invalidate`].
    fn invalidate(&self);

    /// Recompute state now and emit [`Event::Reload`].
    fn reload(&self);

    /// Register `handler` for every event this source emits.
    #[must_use = "dropping the subscription unregisters the handler"]
    fn observe(&self, handler: Box<dyn Fn(&Event)>) -> Subscription {
        self.observers().subscribe(handler)
    }

    /// Broadcast `event` to current observers unless delivery is disabled.
    fn send(&self, event: Event) {
        self.observers().send(&event);
    }

    fn disable_events(&self) {
        self.observers().disable();
    }

    fn enable_events(&self) {
        self.observers().enable();
    }

    /// True when there are no sections or every section is empty.
    fn is_empty(&self) -> bool {
        (0..self.sections_count()).all(|section| self.number_of_objects(section) == 0)
    }

    /// Every object of `section`, in order.
    fn objects_in_section(&self, section: usize) -> Vec<Self::Object> {
        let count = self.number_of_objects(section);
        (0..count)
            .map(|item| self.object_at(IndexPath::new(section, item)))
            .collect()
    }

    /// Checked form of [`section_at`](Self::section_at).
    fn try_section_at(&self, index: usize) -> Result<SectionInfo> {
        ContractViolation::check_section(index, self.sections_count())?;
        Ok(self.section_at(index))
    }

    /// Checked form of [`object_at`](Self::object_at).
    fn try_object_at(&self, index_path: IndexPath) -> Result<Self::Object> {
        ContractViolation::check_section(index_path.section, self.sections_count())?;
        ContractViolation::check_item(index_path, self.number_of_objects(index_path.section))?;
        Ok(self.object_at(index_path))
    }
}
