#![forbid(unsafe_code)]

//! Lazily mapped projection of another data source.
//!
//! # Design
//!
//! [`MappingDataSource<R, T>`] presents an origin `DataSource<Object = R>`
//! through a `map: R -> T` function. It keeps one [`MappingSection`] per
//! origin section; each holds a sparse cache of mapped objects aligned
//! 1:1 with the origin section's items. A slot is filled the first time it
//! is read and stays filled until an origin event touches that position.
//!
//! The source subscribes to its origin and translates each event:
//!
//! | origin event        | local effect                                   |
//! |---------------------|------------------------------------------------|
//! | `Invalidate`        | mark invalidated, re-emit                      |
//! | `Reload`            | rebuild now (ignored while rebuilding)         |
//! | `SectionUpdate`     | insert / remove / reset sections, re-emit      |
//! | `ObjectUpdate`      | shift or clear cache slots, re-emit            |
//! | begin / end update  | re-emit                                        |
//!
//! # Invariants
//!
//! 1. `map` runs at most once per slot between two events that touch it.
//! 2. Section and object counts always equal the origin's counts as of the
//!    last event delivered.
//! 3. Each section's `origin_index` equals its position whenever it is used;
//!    section inserts and deletes only flag the alignment dirty and the next
//!    access renumbers.
//! 4. No internal borrow is held while calling into the origin or while
//!    delivering events.
//!
//! # Ownership
//!
//! The origin's observer set only holds a weak handle to the event handler;
//! the strong [`Subscription`] lives inside this source and is dropped with
//! it, so an origin never keeps a derived source alive and a dropped derived
//! source receives nothing further.
//!
//! # Example
//!
//! ```
//! use sectioned_core::{ArraySection, DataSource, IndexPath};
//! use sectioned_store::{ArrayDataSource, MappingDataSource};
//!
//! let numbers = ArrayDataSource::<i32>::new();
//! let labels = MappingDataSource::new(&numbers, |n: i32| n.to_string());
//!
//! numbers.append(1);
//! numbers.append_section(ArraySection::new(vec![10]));
//!
//! assert_eq!(labels.sections_count(), 2);
//! assert_eq!(labels.object_at(IndexPath::new(1, 0)), "10");
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use sectioned_core::{
    ChangeType, ContractViolation, DataSource, Enforce, Event, IndexPath, ObjectChange,
    ObserverSet, Section, SectionChange, SectionInfo, SourceConfig, Subscription, UserInfo,
    violation,
};
use tracing::debug;

use crate::batch::{ScopedFlag, broadcast};

type Origin<R> = Rc<dyn DataSource<Object = R>>;
type MapFn<R, T> = Rc<dyn Fn(R) -> T>;

// ---------------------------------------------------------------------------
// MappingSection
// ---------------------------------------------------------------------------

/// A section of mapped objects backed by one origin section.
///
/// Owns only the sparse cache; the objects themselves are read from the
/// origin on demand. Name and user info fall back to the origin section's
/// unless overridden.
pub struct MappingSection<R, T> {
    origin: Origin<R>,
    map: MapFn<R, T>,
    origin_index: usize,
    cache: Vec<Option<T>>,
    name: Option<String>,
    user_info: Option<UserInfo>,
}

impl<R, T: fmt::Debug> fmt::Debug for MappingSection<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingSection")
            .field("origin_index", &self.origin_index)
            .field("cache", &self.cache)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn empty_cache<T>(len: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

impl<R: 'static, T: Clone + 'static> MappingSection<R, T> {
    /// Section over origin section `origin_index`, with every slot empty.
    ///
    /// # Panics
    ///
    /// Panics if the origin has no section `origin_index`.
    pub fn new(origin: Origin<R>, origin_index: usize, map: MapFn<R, T>) -> Self {
        let len = origin.number_of_objects(origin_index);
        Self::with_len(origin, origin_index, map, len)
    }

    fn with_len(origin: Origin<R>, origin_index: usize, map: MapFn<R, T>, len: usize) -> Self {
        Self {
            origin,
            map,
            origin_index,
            cache: empty_cache(len),
            name: None,
            user_info: None,
        }
    }

    #[must_use]
    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    /// Cached value at `index`, without computing it.
    #[must_use]
    pub fn cached(&self, index: usize) -> Option<&T> {
        self.cache.get(index).and_then(Option::as_ref)
    }

    /// Number of filled slots.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.iter().filter(|slot| slot.is_some()).count()
    }

    /// Mapped object at `index`, computing and caching it if needed.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn object_at(&mut self, index: usize) -> T {
        self.check(index);
        if let Some(object) = &self.cache[index] {
            return object.clone();
        }
        let raw = self
            .origin
            .object_at(IndexPath::new(self.origin_index, index));
        let object = (self.map)(raw);
        self.cache[index] = Some(object.clone());
        object
    }

    /// Every mapped object, computing missing ones.
    pub fn objects(&mut self) -> Vec<T> {
        (0..self.cache.len()).map(|index| self.object_at(index)).collect()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn set_user_info(&mut self, user_info: Option<UserInfo>) {
        self.user_info = user_info;
    }

    /// Open a slot at `index`, shifting later slots right.
    #[track_caller]
    pub fn insert_slot(&mut self, index: usize, object: Option<T>) {
        ContractViolation::check_insertion(
            IndexPath::new(self.origin_index, index),
            self.cache.len(),
        )
        .enforce();
        self.cache.insert(index, object);
    }

    /// Close the slot at `index`, returning whatever it cached.
    #[track_caller]
    pub fn remove_slot(&mut self, index: usize) -> Option<T> {
        self.check(index);
        self.cache.remove(index)
    }

    /// Forget the cached value at `index`.
    #[track_caller]
    pub fn invalidate_object_at(&mut self, index: usize) {
        self.check(index);
        self.cache[index] = None;
    }

    /// Forget every cached value and resize to the origin section's count.
    pub fn invalidate_objects(&mut self) {
        let len = self.origin.number_of_objects(self.origin_index);
        self.reset(len);
    }

    fn reset(&mut self, len: usize) {
        self.cache = empty_cache(len);
    }

    fn store(&mut self, index: usize, object: T) {
        if let Some(slot) = self.cache.get_mut(index) {
            *slot = Some(object);
        }
    }

    #[track_caller]
    fn check(&self, index: usize) {
        ContractViolation::check_item(IndexPath::new(self.origin_index, index), self.cache.len())
            .enforce();
    }
}

impl<R, T> Section for MappingSection<R, T> {
    fn name(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.origin.section_at(self.origin_index).name)
    }

    fn user_info(&self) -> Option<UserInfo> {
        self.user_info
            .clone()
            .or_else(|| self.origin.section_at(self.origin_index).user_info)
    }

    fn number_of_objects(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// MappingDataSource
// ---------------------------------------------------------------------------

struct MappingInner<R, T> {
    origin: Origin<R>,
    map: MapFn<R, T>,
    sections: RefCell<Vec<MappingSection<R, T>>>,
    invalidated: Cell<bool>,
    reloading: Cell<bool>,
    sections_index_invalid: Cell<bool>,
    observers: ObserverSet<Event>,
    config: SourceConfig,
    _subscription: Subscription,
}

/// Read-only data source mapping every object of an origin source.
///
/// Cloning creates a new handle to the **same** state.
///
/// # Panics
///
/// The mapping only learns about origin changes through events. After a
/// silent origin batch (`apply(true, ..)`) its section sizes are stale until
/// the origin reloads, for example with `set_sections(origin.sections())`.
/// Until then [`DataSource::object_at`] may return stale values or panic in
/// the origin for items the batch removed.
pub struct MappingDataSource<R, T> {
    inner: Rc<MappingInner<R, T>>,
}

impl<R, T> Clone for MappingDataSource<R, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R, T: fmt::Debug> fmt::Debug for MappingDataSource<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingDataSource")
            .field("label", &self.inner.config.label())
            .field("sections", &self.inner.sections.borrow())
            .field("invalidated", &self.inner.invalidated.get())
            .finish_non_exhaustive()
    }
}

impl<R: 'static, T: Clone + 'static> MappingDataSource<R, T> {
    /// Project `origin` through `map`.
    #[must_use]
    pub fn new<S>(origin: &S, map: impl Fn(R) -> T + 'static) -> Self
    where
        S: DataSource<Object = R> + Clone + 'static,
    {
        Self::with_config(origin, map, SourceConfig::new("mapping"))
    }

    #[must_use]
    pub fn with_config<S>(origin: &S, map: impl Fn(R) -> T + 'static, config: SourceConfig) -> Self
    where
        S: DataSource<Object = R> + Clone + 'static,
    {
        Self::from_shared(Rc::new(origin.clone()), map, config)
    }

    /// Project an origin that is already shared as a trait object.
    #[must_use]
    pub fn from_shared(
        origin: Origin<R>,
        map: impl Fn(R) -> T + 'static,
        config: SourceConfig,
    ) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<MappingInner<R, T>>| {
            let handle = weak.clone();
            let subscription = origin.observe(Box::new(move |event: &Event| {
                if let Some(inner) = handle.upgrade() {
                    MappingDataSource { inner }.handle_event(event);
                }
            }));
            MappingInner {
                origin,
                map: Rc::new(map),
                sections: RefCell::new(Vec::new()),
                invalidated: Cell::new(true),
                reloading: Cell::new(false),
                sections_index_invalid: Cell::new(false),
                observers: ObserverSet::new(),
                config,
                _subscription: subscription,
            }
        });
        Self { inner }
    }

    #[must_use]
    pub fn origin(&self) -> &Origin<R> {
        &self.inner.origin
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.inner.config
    }

    fn emit(&self, event: &Event) {
        broadcast(&self.inner.observers, &self.inner.config, event);
    }

    // ── Reload ──────────────────────────────────────────────────────────

    fn ensure_loaded(&self) {
        if self.inner.invalidated.get() {
            self.rebuild();
        } else {
            self.reindex_sections_if_needed();
        }
    }

    fn reindex_sections_if_needed(&self) {
        if self.inner.sections_index_invalid.replace(false) {
            for (index, section) in self.inner.sections.borrow_mut().iter_mut().enumerate() {
                section.origin_index = index;
            }
        }
    }

    fn rebuild(&self) {
        let sections = {
            // Reading the origin may make it reload and echo `Reload` back.
            let _reloading = ScopedFlag::raise(&self.inner.reloading);
            let count = self.inner.origin.sections_count();
            (0..count)
                .map(|index| {
                    MappingSection::new(
                        Rc::clone(&self.inner.origin),
                        index,
                        Rc::clone(&self.inner.map),
                    )
                })
                .collect::<Vec<_>>()
        };
        debug!(
            source = self.inner.config.label(),
            sections = sections.len(),
            "reload"
        );

        *self.inner.sections.borrow_mut() = sections;
        self.inner.invalidated.set(false);
        self.inner.sections_index_invalid.set(false);
        self.emit(&Event::Reload);
    }

    /// Drop the cached value at `index_path` and emit an update for it.
    ///
    /// # Panics
    ///
    /// Panics if `index_path` does not address an existing object.
    #[track_caller]
    pub fn reload_object_at(&self, index_path: IndexPath) {
        self.check_object(index_path);
        self.inner.sections.borrow_mut()[index_path.section]
            .invalidate_object_at(index_path.item);
        self.emit(&Event::ObjectUpdate(ObjectChange::Update {
            source: index_path,
        }));
    }

    // ── Access ──────────────────────────────────────────────────────────

    /// Borrow the mapping section at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds, or if `f` reads this source.
    #[track_caller]
    pub fn with_section<Out>(
        &self,
        index: usize,
        f: impl FnOnce(&mut MappingSection<R, T>) -> Out,
    ) -> Out {
        self.ensure_loaded();
        let mut sections = self.inner.sections.borrow_mut();
        ContractViolation::check_section(index, sections.len()).enforce();
        f(&mut sections[index])
    }

    #[track_caller]
    fn check_object(&self, index_path: IndexPath) {
        self.ensure_loaded();
        let sections = self.inner.sections.borrow();
        ContractViolation::check_section(index_path.section, sections.len()).enforce();
        ContractViolation::check_item(index_path, sections[index_path.section].cache.len())
            .enforce();
    }

    /// First index path, in section-then-item order, whose mapped object
    /// matches. Maps (and caches) every object it visits.
    pub fn index_path_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<IndexPath> {
        for section in 0..self.sections_count() {
            for item in 0..self.number_of_objects(section) {
                let index_path = IndexPath::new(section, item);
                if predicate(&self.object_at(index_path)) {
                    return Some(index_path);
                }
            }
        }
        None
    }

    // ── Event translation ───────────────────────────────────────────────

    fn handle_event(&self, event: &Event) {
        match event {
            Event::Invalidate => self.invalidate(),
            Event::Reload if self.inner.reloading.get() => {}
            Event::Reload => self.rebuild(),
            Event::SectionUpdate(change) => {
                if !self.inner.invalidated.get() {
                    self.apply_section_change(change);
                }
                self.emit(event);
            }
            Event::ObjectUpdate(change) => {
                if !self.inner.invalidated.get() {
                    self.apply_object_change(*change);
                }
                self.emit(event);
            }
            Event::WillBeginUpdate | Event::DidEndUpdate => self.emit(event),
        }
    }

    fn apply_section_change(&self, change: &SectionChange) {
        debug!(
            source = self.inner.config.label(),
            kind = %change.kind,
            indexes = ?change.indexes,
            "section change"
        );
        match change.kind {
            ChangeType::Insert => {
                for &index in &change.indexes {
                    let len = self.inner.origin.number_of_objects(index);
                    let section = MappingSection::with_len(
                        Rc::clone(&self.inner.origin),
                        index,
                        Rc::clone(&self.inner.map),
                        len,
                    );
                    let mut sections = self.inner.sections.borrow_mut();
                    ContractViolation::check_section(index, sections.len() + 1).enforce();
                    sections.insert(index, section);
                }
            }
            ChangeType::Delete => {
                let mut sections = self.inner.sections.borrow_mut();
                for &index in change.indexes.iter().rev() {
                    ContractViolation::check_section(index, sections.len()).enforce();
                    sections.remove(index);
                }
            }
            ChangeType::Move => violation(ContractViolation::SectionMoveUnsupported),
            ChangeType::Update => {
                for &index in &change.indexes {
                    let len = self.inner.origin.number_of_objects(index);
                    let mut sections = self.inner.sections.borrow_mut();
                    ContractViolation::check_section(index, sections.len()).enforce();
                    sections[index].reset(len);
                }
            }
        }
        self.inner.sections_index_invalid.set(true);
    }

    fn apply_object_change(&self, change: ObjectChange) {
        let mut sections = self.inner.sections.borrow_mut();
        match change {
            ObjectChange::Insert { target } => {
                section_mut(&mut sections, target.section).insert_slot(target.item, None);
            }
            ObjectChange::Delete { source } => {
                section_mut(&mut sections, source.section).remove_slot(source.item);
            }
            ObjectChange::Move { source, target } => {
                let cached = section_mut(&mut sections, source.section).remove_slot(source.item);
                section_mut(&mut sections, target.section).insert_slot(target.item, cached);
            }
            ObjectChange::Update { source } => {
                section_mut(&mut sections, source.section).invalidate_object_at(source.item);
            }
        }
    }
}

#[track_caller]
fn section_mut<R, T>(
    sections: &mut [MappingSection<R, T>],
    index: usize,
) -> &mut MappingSection<R, T> {
    ContractViolation::check_section(index, sections.len()).enforce();
    &mut sections[index]
}

impl<R: 'static, T: Clone + 'static> DataSource for MappingDataSource<R, T> {
    type Object = T;

    fn observers(&self) -> &ObserverSet<Event> {
        &self.inner.observers
    }

    fn sections_count(&self) -> usize {
        self.ensure_loaded();
        self.inner.sections.borrow().len()
    }

    fn section_at(&self, index: usize) -> SectionInfo {
        self.ensure_loaded();
        let (name, user_info, origin_index, number_of_objects) = {
            let sections = self.inner.sections.borrow();
            ContractViolation::check_section(index, sections.len()).enforce();
            let section = &sections[index];
            (
                section.name.clone(),
                section.user_info.clone(),
                section.origin_index,
                section.cache.len(),
            )
        };
        let fallback = (name.is_none() || user_info.is_none())
            .then(|| self.inner.origin.section_at(origin_index));
        SectionInfo {
            name: name.or_else(|| fallback.as_ref().and_then(|info| info.name.clone())),
            user_info: user_info
                .or_else(|| fallback.as_ref().and_then(|info| info.user_info.clone())),
            number_of_objects,
        }
    }

    fn number_of_objects(&self, section: usize) -> usize {
        self.ensure_loaded();
        let sections = self.inner.sections.borrow();
        ContractViolation::check_section(section, sections.len()).enforce();
        sections[section].cache.len()
    }

    fn object_at(&self, index_path: IndexPath) -> T {
        self.check_object(index_path);
        let origin_index = {
            let sections = self.inner.sections.borrow();
            let section = &sections[index_path.section];
            if let Some(object) = section.cached(index_path.item) {
                return object.clone();
            }
            section.origin_index
        };

        let raw = self
            .inner
            .origin
            .object_at(IndexPath::new(origin_index, index_path.item));
        let object = (self.inner.map)(raw);
        if let Some(section) = self.inner.sections.borrow_mut().get_mut(index_path.section) {
            section.store(index_path.item, object.clone());
        }
        object
    }

    fn invalidate(&self) {
        debug!(source = self.inner.config.label(), "invalidate");
        self.inner.invalidated.set(true);
        self.emit(&Event::Invalidate);
    }

    fn reload(&self) {
        self.rebuild();
    }
}
