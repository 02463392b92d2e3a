#![forbid(unsafe_code)]

//! Mutable, array-backed data source.
//!
//! # Design
//!
//! [`ArrayDataSource<T>`] is a cheaply cloneable handle; clones share the
//! same sections and observers. Sections are populated lazily from an
//! optional [`Resolver`]: the source starts invalidated, and the first read
//! after construction or [`invalidate`](DataSource::invalidate) calls
//! [`reload`](DataSource::reload), which replaces every section with the
//! resolver's output and emits [`Event::Reload`].
//!
//! Every structural mutation runs inside [`apply`](ArrayDataSource::apply):
//! outside a caller-managed transaction it is bracketed by
//! `WillBeginUpdate` / `DidEndUpdate`, so a single call emits exactly one
//! batch holding one structural event.
//!
//! # Invariants
//!
//! 1. State is updated before the matching event is sent, and no borrow is
//!    held during delivery, so observers read post-mutation counts.
//! 2. Preconditions are checked before any state change; a violation
//!    aborts with nothing mutated and nothing emitted.
//! 3. `begin_update` / `end_update` strictly alternate.
//! 4. Moves use post-removal coordinates: the target is where the object
//!    ends up after it was taken out of its source position.
//!
//! # Example
//!
//! ```
//! use sectioned_core::{DataSource, IndexPath};
//! use sectioned_store::ArrayDataSource;
//!
//! let source = ArrayDataSource::from_objects(vec!['a', 'b', 'c']);
//! source.move_object(IndexPath::new(0, 0), IndexPath::new(0, 2));
//! assert_eq!(source.objects_in_section(0), vec!['b', 'c', 'a']);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use sectioned_core::{
    ArraySection, ContractViolation, DataSource, Enforce, Event, IndexPath, ObjectChange,
    ObserverSet, SectionChange, SectionInfo, SourceConfig, violation,
};
use tracing::debug;

use crate::batch::{SilenceGuard, broadcast};

/// Supplies the full section list on (re)load.
pub type Resolver<T> = Box<dyn Fn() -> Vec<ArraySection<T>>>;

struct ArrayInner<T> {
    resolver: Option<Resolver<T>>,
    sections: RefCell<Vec<ArraySection<T>>>,
    invalidated: Cell<bool>,
    updating: Cell<bool>,
    observers: ObserverSet<Event>,
    config: SourceConfig,
}

/// Owned, mutable sectioned storage.
pub struct ArrayDataSource<T> {
    inner: Rc<ArrayInner<T>>,
}

impl<T> Clone for ArrayDataSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ArrayDataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayDataSource")
            .field("label", &self.inner.config.label())
            .field("sections", &self.inner.sections.borrow())
            .field("invalidated", &self.inner.invalidated.get())
            .field("updating", &self.inner.updating.get())
            .finish()
    }
}

impl<T: Clone + 'static> Default for ArrayDataSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ArrayDataSource<T> {
    /// Empty source without a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SourceConfig::new("array"))
    }

    #[must_use]
    pub fn with_config(config: SourceConfig) -> Self {
        Self::build(None, config)
    }

    /// Source whose sections come from `resolver` on every reload.
    #[must_use]
    pub fn from_resolver(resolver: impl Fn() -> Vec<ArraySection<T>> + 'static) -> Self {
        Self::from_resolver_with_config(resolver, SourceConfig::new("array"))
    }

    #[must_use]
    pub fn from_resolver_with_config(
        resolver: impl Fn() -> Vec<ArraySection<T>> + 'static,
        config: SourceConfig,
    ) -> Self {
        Self::build(Some(Box::new(resolver)), config)
    }

    /// Single-section source that reloads to `objects`.
    #[must_use]
    pub fn from_objects(objects: Vec<T>) -> Self {
        Self::from_resolver(move || vec![ArraySection::new(objects.clone())])
    }

    /// Source whose resolver yields one plain list per section.
    #[must_use]
    pub fn from_nested(resolver: impl Fn() -> Vec<Vec<T>> + 'static) -> Self {
        Self::from_resolver(move || resolver().into_iter().map(ArraySection::new).collect())
    }

    fn build(resolver: Option<Resolver<T>>, config: SourceConfig) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                resolver,
                sections: RefCell::new(Vec::new()),
                invalidated: Cell::new(true),
                updating: Cell::new(false),
                observers: ObserverSet::new(),
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.inner.config
    }

    // ── Batch update ────────────────────────────────────────────────────

    /// Whether a transaction is open.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.inner.updating.get()
    }

    /// Open a transaction and emit [`Event::WillBeginUpdate`].
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already open.
    #[track_caller]
    pub fn begin_update(&self) {
        if self.inner.updating.get() {
            violation(ContractViolation::NestedBeginUpdate);
        }
        self.inner.updating.set(true);
        debug!(source = self.inner.config.label(), "begin update");
        self.emit(Event::WillBeginUpdate);
    }

    /// Close the open transaction and emit [`Event::DidEndUpdate`].
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    #[track_caller]
    pub fn end_update(&self) {
        if !self.inner.updating.get() {
            violation(ContractViolation::EndUpdateWithoutBegin);
        }
        self.inner.updating.set(false);
        debug!(source = self.inner.config.label(), "end update");
        self.emit(Event::DidEndUpdate);
    }

    /// Run `body` as one batch.
    ///
    /// Opens and closes a transaction around `body` unless one is already
    /// open. With `silently`, delivery is disabled while `body` runs (the
    /// transaction brackets are still delivered). Delivery is re-enabled and
    /// a transaction opened here is closed even if `body` panics.
    pub fn apply<R>(&self, silently: bool, body: impl FnOnce(&Self) -> R) -> R {
        let _transaction = (!self.inner.updating.get()).then(|| {
            self.begin_update();
            TransactionGuard { source: self }
        });
        let _silence = silently.then(|| SilenceGuard::new(&self.inner.observers));
        body(self)
    }

    // ── Reload ──────────────────────────────────────────────────────────

    fn ensure_loaded(&self) {
        if self.inner.invalidated.get() {
            self.reload_from_resolver();
        }
    }

    fn reload_from_resolver(&self) {
        let sections = self
            .inner
            .resolver
            .as_ref()
            .map(|resolve| resolve())
            .unwrap_or_default();
        self.replace_all(sections);
    }

    fn replace_all(&self, sections: Vec<ArraySection<T>>) {
        debug!(
            source = self.inner.config.label(),
            sections = sections.len(),
            "reload"
        );
        *self.inner.sections.borrow_mut() = sections;
        self.inner.invalidated.set(false);
        self.emit(Event::Reload);
    }

    /// Replace everything with a single section holding `objects`.
    pub fn set_objects(&self, objects: Vec<T>) {
        self.replace_all(vec![ArraySection::new(objects)]);
    }

    /// Replace every section. Emits [`Event::Reload`] rather than
    /// incremental events.
    pub fn set_sections(&self, sections: Vec<ArraySection<T>>) {
        self.replace_all(sections);
    }

    fn emit(&self, event: Event) {
        broadcast(&self.inner.observers, &self.inner.config, &event);
    }

    // ── Access ──────────────────────────────────────────────────────────

    fn read<R>(&self, f: impl FnOnce(&[ArraySection<T>]) -> R) -> R {
        self.ensure_loaded();
        f(&self.inner.sections.borrow())
    }

    /// Borrow the section at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds, or if `f` mutates this source.
    #[track_caller]
    pub fn with_section<R>(&self, index: usize, f: impl FnOnce(&ArraySection<T>) -> R) -> R {
        self.read(|sections| {
            ContractViolation::check_section(index, sections.len()).enforce();
            f(&sections[index])
        })
    }

    /// Clone of every section.
    #[must_use]
    pub fn sections(&self) -> Vec<ArraySection<T>> {
        self.read(<[ArraySection<T>]>::to_vec)
    }

    #[track_caller]
    fn check_section(&self, index: usize) -> usize {
        let count = self.read(<[ArraySection<T>]>::len);
        ContractViolation::check_section(index, count).enforce();
        count
    }

    #[track_caller]
    fn check_object(&self, index_path: IndexPath) {
        self.check_section(index_path.section);
        let count = self.read(|sections| sections[index_path.section].len());
        ContractViolation::check_item(index_path, count).enforce();
    }

    // ── Mutation: objects ───────────────────────────────────────────────

    /// Append to the last section, creating one if there are none.
    pub fn append(&self, object: T) {
        let count = self.read(<[ArraySection<T>]>::len);
        match count.checked_sub(1) {
            Some(last) => self.append_to_section(object, last),
            None => self.append_section(ArraySection::new(vec![object])),
        }
    }

    /// # Panics
    ///
    /// Panics if `section` is out of bounds.
    #[track_caller]
    pub fn append_to_section(&self, object: T, section: usize) {
        self.check_section(section);
        let end = self.read(|sections| sections[section].len());
        self.insert(object, IndexPath::new(section, end));
    }

    /// Insert so that `object` ends up at `index_path`.
    ///
    /// # Panics
    ///
    /// Panics if the section is out of bounds or the item index exceeds the
    /// section's length.
    #[track_caller]
    pub fn insert(&self, object: T, index_path: IndexPath) {
        self.check_section(index_path.section);
        let count = self.read(|sections| sections[index_path.section].len());
        ContractViolation::check_insertion(index_path, count).enforce();

        self.apply(false, |source| {
            source.inner.sections.borrow_mut()[index_path.section].insert(object, index_path.item);
            source.emit(Event::ObjectUpdate(ObjectChange::Insert { target: index_path }));
        });
    }

    /// # Panics
    ///
    /// Panics if `index_path` does not address an existing object.
    #[track_caller]
    pub fn remove(&self, index_path: IndexPath) -> T {
        self.check_object(index_path);

        self.apply(false, |source| {
            let removed =
                source.inner.sections.borrow_mut()[index_path.section].remove(index_path.item);
            source.emit(Event::ObjectUpdate(ObjectChange::Delete { source: index_path }));
            removed
        })
    }

    /// Replace in place, returning the previous object.
    ///
    /// # Panics
    ///
    /// Panics if `index_path` does not address an existing object.
    #[track_caller]
    pub fn replace(&self, index_path: IndexPath, object: T) -> T {
        self.check_object(index_path);

        self.apply(false, |source| {
            let previous = source.inner.sections.borrow_mut()[index_path.section]
                .replace(index_path.item, object);
            source.emit(Event::ObjectUpdate(ObjectChange::Update { source: index_path }));
            previous
        })
    }

    /// Move the object at `from` so it ends up at `to`.
    ///
    /// `to` is measured after removal: within one section of length `n`,
    /// valid targets are `0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `from` does not address an object or `to` is not a valid
    /// post-removal insertion point.
    #[track_caller]
    pub fn move_object(&self, from: IndexPath, to: IndexPath) {
        self.check_object(from);
        self.check_section(to.section);
        let target_count = self.read(|sections| {
            let count = sections[to.section].len();
            if to.section == from.section { count - 1 } else { count }
        });
        ContractViolation::check_insertion(to, target_count).enforce();

        self.apply(false, |source| {
            {
                let mut sections = source.inner.sections.borrow_mut();
                let object = sections[from.section].remove(from.item);
                sections[to.section].insert(object, to.item);
            }
            source.emit(Event::ObjectUpdate(ObjectChange::Move {
                source: from,
                target: to,
            }));
        });
    }

    // ── Mutation: sections ──────────────────────────────────────────────

    pub fn append_section(&self, section: ArraySection<T>) {
        let end = self.read(<[ArraySection<T>]>::len);
        self.insert_section(section, end);
    }

    /// # Panics
    ///
    /// Panics if `index` exceeds the number of sections.
    #[track_caller]
    pub fn insert_section(&self, section: ArraySection<T>, index: usize) {
        let count = self.read(<[ArraySection<T>]>::len);
        ContractViolation::check_section(index, count + 1).enforce();

        self.apply(false, |source| {
            source.inner.sections.borrow_mut().insert(index, section);
            source.emit(Event::SectionUpdate(SectionChange::insert(index)));
        });
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn remove_section(&self, index: usize) -> ArraySection<T> {
        self.check_section(index);

        self.apply(false, |source| {
            let removed = source.inner.sections.borrow_mut().remove(index);
            source.emit(Event::SectionUpdate(SectionChange::delete(index)));
            removed
        })
    }

    /// Replace a whole section in place, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn replace_section(&self, index: usize, section: ArraySection<T>) -> ArraySection<T> {
        self.check_section(index);

        self.apply(false, |source| {
            let previous =
                std::mem::replace(&mut source.inner.sections.borrow_mut()[index], section);
            source.emit(Event::SectionUpdate(SectionChange::update(index)));
            previous
        })
    }

    // ── Search ──────────────────────────────────────────────────────────

    /// First index path, in section-then-item order, whose object matches.
    pub fn index_path_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<IndexPath> {
        self.read(|sections| {
            sections.iter().enumerate().find_map(|(section, objects)| {
                objects
                    .position(&mut predicate)
                    .map(|item| IndexPath::new(section, item))
            })
        })
    }
}

impl<T: Clone + PartialEq + 'static> ArrayDataSource<T> {
    /// First index path holding an object equal to `object`. Linear scan.
    pub fn index_path_of(&self, object: &T) -> Option<IndexPath> {
        self.index_path_where(|candidate| candidate == object)
    }

    /// Remove the first object equal to `object`, if any.
    pub fn remove_object(&self, object: &T) -> Option<T> {
        self.index_path_of(object)
            .map(|index_path| self.remove(index_path))
    }
}

/// Closes a transaction opened by [`ArrayDataSource::apply`] when dropped.
struct TransactionGuard<'a, T: Clone + 'static> {
    source: &'a ArrayDataSource<T>,
}

impl<T: Clone + 'static> Drop for TransactionGuard<'_, T> {
    fn drop(&mut self) {
        self.source.end_update();
    }
}

impl<T: Clone + 'static> DataSource for ArrayDataSource<T> {
    type Object = T;

    fn observers(&self) -> &ObserverSet<Event> {
        &self.inner.observers
    }

    fn sections_count(&self) -> usize {
        self.read(<[ArraySection<T>]>::len)
    }

    fn section_at(&self, index: usize) -> SectionInfo {
        self.with_section(index, |section| SectionInfo::of(section))
    }

    fn number_of_objects(&self, section: usize) -> usize {
        self.with_section(section, ArraySection::len)
    }

    fn object_at(&self, index_path: IndexPath) -> T {
        self.check_object(index_path);
        self.read(|sections| sections[index_path.section].object_at(index_path.item).clone())
    }

    fn invalidate(&self) {
        debug!(source = self.inner.config.label(), "invalidate");
        self.inner.invalidated.set(true);
        self.emit(Event::Invalidate);
    }

    fn reload(&self) {
        self.reload_from_resolver();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn record<S: DataSource>(source: &S) -> (Rc<RefCell<Vec<Event>>>, sectioned_core::Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let sub = source.observe(Box::new(move |event: &Event| {
            sink.borrow_mut().push(event.clone());
        }));
        (log, sub)
    }

    fn loaded(objects: Vec<char>) -> ArrayDataSource<char> {
        let source = ArrayDataSource::new();
        source.set_objects(objects);
        source
    }

    #[test]
    fn lazy_reload_from_resolver_on_first_read() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let source = ArrayDataSource::from_nested(move || {
            counter.set(counter.get() + 1);
            vec![vec![1, 2], vec![3]]
        });
        let (log, _sub) = record(&source);

        assert_eq!(calls.get(), 0);
        assert_eq!(source.sections_count(), 2);
        assert_eq!(calls.get(), 1);
        assert_eq!(*log.borrow(), vec![Event::Reload]);

        // Loaded: further reads do not re-resolve.
        assert_eq!(source.number_of_objects(1), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn invalidate_defers_reload_until_next_read() {
        let source = ArrayDataSource::from_objects(vec![1, 2, 3]);
        assert_eq!(source.number_of_objects(0), 3);
        let (log, _sub) = record(&source);

        source.invalidate();
        assert_eq!(*log.borrow(), vec![Event::Invalidate]);

        assert_eq!(source.object_at(IndexPath::new(0, 2)), 3);
        assert_eq!(*log.borrow(), vec![Event::Invalidate, Event::Reload]);
    }

    #[test]
    fn reload_without_resolver_clears() {
        let source = loaded(vec!['a']);
        source.reload();
        assert_eq!(source.sections_count(), 0);
        assert!(source.is_empty());
    }

    #[test]
    fn single_mutation_emits_one_batch() {
        let source = loaded(vec!['a', 'b']);
        let (log, _sub) = record(&source);

        source.insert('x', IndexPath::new(0, 1));

        assert_eq!(
            *log.borrow(),
            vec![
                Event::WillBeginUpdate,
                Event::ObjectUpdate(ObjectChange::Insert {
                    target: IndexPath::new(0, 1)
                }),
                Event::DidEndUpdate,
            ]
        );
        assert_eq!(source.objects_in_section(0), vec!['a', 'x', 'b']);
    }

    #[test]
    fn append_to_empty_source_creates_a_section() {
        let source = ArrayDataSource::<i32>::new();
        let (log, _sub) = record(&source);

        source.append(7);
        source.append(8);

        assert_eq!(source.sections_count(), 1);
        assert_eq!(source.objects_in_section(0), vec![7, 8]);
        let events = log.borrow();
        assert!(events.contains(&Event::SectionUpdate(SectionChange::insert(0))));
        assert!(events.contains(&Event::ObjectUpdate(ObjectChange::Insert {
            target: IndexPath::new(0, 1)
        })));
    }

    #[test]
    fn counts_match_after_many_appends() {
        let source = ArrayDataSource::<u32>::new();
        for value in 0..25 {
            source.append(value);
        }
        assert_eq!(source.number_of_objects(0), 25);
    }

    #[test]
    fn remove_and_replace_report_source_path() {
        let source = loaded(vec!['a', 'b', 'c']);
        let (log, _sub) = record(&source);

        assert_eq!(source.remove(IndexPath::new(0, 0)), 'a');
        assert_eq!(source.replace(IndexPath::new(0, 1), 'z'), 'c');

        assert_eq!(source.objects_in_section(0), vec!['b', 'z']);
        let structural: Vec<Event> = log
            .borrow()
            .iter()
            .filter(|event| event.is_structural())
            .cloned()
            .collect();
        assert_eq!(
            structural,
            vec![
                Event::ObjectUpdate(ObjectChange::Delete {
                    source: IndexPath::new(0, 0)
                }),
                Event::ObjectUpdate(ObjectChange::Update {
                    source: IndexPath::new(0, 1)
                }),
            ]
        );
    }

    #[test]
    fn move_uses_post_removal_target() {
        let source = loaded(vec!['a', 'b', 'c']);
        let (log, _sub) = record(&source);

        source.move_object(IndexPath::new(0, 0), IndexPath::new(0, 2));

        assert_eq!(source.objects_in_section(0), vec!['b', 'c', 'a']);
        assert_eq!(
            log.borrow()[1],
            Event::ObjectUpdate(ObjectChange::Move {
                source: IndexPath::new(0, 0),
                target: IndexPath::new(0, 2),
            })
        );
    }

    #[test]
    fn move_across_sections() {
        let source = ArrayDataSource::new();
        source.set_sections(vec![
            ArraySection::new(vec![1, 2]),
            ArraySection::new(vec![3]),
        ]);

        source.move_object(IndexPath::new(0, 1), IndexPath::new(1, 1));

        assert_eq!(source.objects_in_section(0), vec![1]);
        assert_eq!(source.objects_in_section(1), vec![3, 2]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn move_target_past_post_removal_end_panics() {
        let source = loaded(vec!['a', 'b', 'c']);
        source.move_object(IndexPath::new(0, 0), IndexPath::new(0, 3));
    }

    #[test]
    fn failed_precondition_leaves_state_untouched() {
        let source = loaded(vec!['a']);
        let (log, _sub) = record(&source);

        let result = catch_unwind(AssertUnwindSafe(|| {
            source.insert('x', IndexPath::new(0, 5));
        }));

        assert!(result.is_err());
        assert!(log.borrow().is_empty());
        assert!(!source.is_updating());
        assert_eq!(source.objects_in_section(0), vec!['a']);
    }

    #[test]
    #[should_panic(expected = "section index 1 out of bounds")]
    fn object_at_out_of_range_section_panics() {
        let source = loaded(vec!['a']);
        let _ = source.object_at(IndexPath::new(1, 0));
    }

    #[test]
    fn try_object_at_reports_instead_of_panicking() {
        let source = loaded(vec!['a']);
        assert_eq!(source.try_object_at(IndexPath::new(0, 0)), Ok('a'));
        assert_eq!(
            source.try_object_at(IndexPath::new(0, 1)),
            Err(ContractViolation::ItemOutOfBounds {
                index_path: IndexPath::new(0, 1),
                count: 1
            })
        );
        assert!(source.try_section_at(3).is_err());
    }

    #[test]
    fn section_mutations_emit_section_updates() {
        let source = loaded(vec!['a']);
        let (log, _sub) = record(&source);

        source.append_section(ArraySection::named("second", vec!['b']));
        source.insert_section(ArraySection::new(vec![]), 0);
        let removed = source.remove_section(2);
        source.replace_section(0, ArraySection::new(vec!['q']));

        assert_eq!(
            sectioned_core::Section::name(&removed).as_deref(),
            Some("second")
        );
        let structural: Vec<Event> = log
            .borrow()
            .iter()
            .filter(|event| event.is_structural())
            .cloned()
            .collect();
        assert_eq!(
            structural,
            vec![
                Event::SectionUpdate(SectionChange::insert(1)),
                Event::SectionUpdate(SectionChange::insert(0)),
                Event::SectionUpdate(SectionChange::delete(2)),
                Event::SectionUpdate(SectionChange::update(0)),
            ]
        );
        assert_eq!(source.objects_in_section(0), vec!['q']);
        assert_eq!(source.objects_in_section(1), vec!['a']);
    }

    #[test]
    fn explicit_transaction_groups_mutations() {
        let source = loaded(vec![]);
        let (log, _sub) = record(&source);

        source.begin_update();
        source.append('x');
        source.append('y');
        source.end_update();

        let events = log.borrow();
        assert_eq!(events.first(), Some(&Event::WillBeginUpdate));
        assert_eq!(events.last(), Some(&Event::DidEndUpdate));
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::WillBeginUpdate))
                .count(),
            1
        );
        assert_eq!(events.len(), 4);
    }

    #[test]
    #[should_panic(expected = "already in progress")]
    fn nested_begin_update_panics() {
        let source = ArrayDataSource::<i32>::new();
        source.begin_update();
        source.begin_update();
    }

    #[test]
    #[should_panic(expected = "without a matching begin_update")]
    fn end_update_without_begin_panics() {
        let source = ArrayDataSource::<i32>::new();
        source.end_update();
    }

    #[test]
    fn silent_apply_hides_structural_events() {
        let source = loaded(vec!['a']);
        let (log, _sub) = record(&source);

        source.apply(true, |source| {
            source.append('b');
            source.append('c');
        });

        assert_eq!(
            *log.borrow(),
            vec![Event::WillBeginUpdate, Event::DidEndUpdate]
        );
        assert_eq!(source.objects_in_section(0), vec!['a', 'b', 'c']);
        assert!(source.observers().enabled());
    }

    #[test]
    fn silent_apply_reenables_after_panic() {
        let source = loaded(vec!['a']);
        let result = catch_unwind(AssertUnwindSafe(|| {
            source.apply(true, |_| panic!("body failed"));
        }));
        assert!(result.is_err());
        assert!(source.observers().enabled());
    }

    #[test]
    fn panicking_body_still_closes_its_transaction() {
        let source = loaded(vec!['a']);
        let (log, _sub) = record(&source);

        let result = catch_unwind(AssertUnwindSafe(|| {
            source.apply(false, |source| {
                source.append('b');
                panic!("body failed");
            });
        }));

        assert!(result.is_err());
        assert!(!source.is_updating());
        assert_eq!(log.borrow().last(), Some(&Event::DidEndUpdate));

        log.borrow_mut().clear();
        source.append('c');
        assert_eq!(log.borrow().first(), Some(&Event::WillBeginUpdate));
        assert_eq!(log.borrow().last(), Some(&Event::DidEndUpdate));
        source.begin_update();
        source.end_update();
    }

    #[test]
    fn observers_read_post_mutation_state_during_delivery() {
        let source = loaded(vec!['a']);
        let reader = source.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = source.observe(Box::new(move |event: &Event| {
            if event.is_structural() {
                sink.borrow_mut().push(reader.number_of_objects(0));
            }
        }));

        source.append('b');
        source.remove(IndexPath::new(0, 0));

        assert_eq!(*seen.borrow(), vec![2, 1]);
    }

    #[test]
    fn search_and_remove_object() {
        let source = ArrayDataSource::new();
        source.set_sections(vec![
            ArraySection::new(vec![1, 2]),
            ArraySection::new(vec![3, 2]),
        ]);

        assert_eq!(source.index_path_of(&2), Some(IndexPath::new(0, 1)));
        assert_eq!(source.index_path_of(&3), Some(IndexPath::new(1, 0)));
        assert_eq!(source.index_path_where(|v| *v > 5), None);

        assert_eq!(source.remove_object(&2), Some(2));
        assert_eq!(source.index_path_of(&2), Some(IndexPath::new(1, 1)));
        assert_eq!(source.remove_object(&9), None);
    }

    #[test]
    fn section_metadata_snapshot() {
        let source = ArrayDataSource::new();
        source.set_sections(vec![ArraySection::named("inbox", vec![1, 2, 3])]);

        let info = source.section_at(0);
        assert_eq!(info.name.as_deref(), Some("inbox"));
        assert_eq!(info.number_of_objects, 3);
    }

    #[test]
    fn clones_share_state() {
        let a = loaded(vec!['a']);
        let b = a.clone();
        b.append('b');
        assert_eq!(a.number_of_objects(0), 2);
    }
}
