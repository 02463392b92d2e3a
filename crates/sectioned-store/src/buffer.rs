#![forbid(unsafe_code)]

//! Consumer side of the batch protocol.
//!
//! An adapter that mirrors a data source into a list widget cannot apply
//! structural events one by one inside a batch: counts are only final at
//! `DidEndUpdate`. [`UpdateBuffer`] collects events between the batch
//! brackets and releases them together; outside a batch each structural
//! event is released on its own.
//!
//! After `Invalidate` the buffer is stale: the next read of the source
//! answers with `Reload`, so anything seen in between is dropped.
//!
//! [`SectionCounts`] is the smallest possible reconciler: it mirrors only
//! section sizes, which is what a list widget needs to validate its own
//! incremental updates.

use std::mem;

use sectioned_core::{
    ChangeType, ContractViolation, DataSource, Event, ObjectChange, SectionChange, violation,
};

/// What the consumer should do after feeding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconcile {
    /// Discard incremental state and resynchronize from current counts.
    Reload,
    /// Apply these structural events, in order, as one operation.
    Apply(Vec<Event>),
}

/// Buffers structural events until the enclosing batch ends.
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    pending: Vec<Event>,
    in_batch: bool,
    stale: bool,
}

impl UpdateBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a `WillBeginUpdate` has been seen without its `DidEndUpdate`.
    #[must_use]
    pub fn in_batch(&self) -> bool {
        self.in_batch
    }

    /// Whether an `Invalidate` has been seen without a later `Reload`.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of buffered structural events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Feed one event.
    pub fn push(&mut self, event: &Event) -> Option<Reconcile> {
        match event {
            Event::WillBeginUpdate => {
                self.in_batch = true;
                None
            }
            Event::DidEndUpdate => {
                self.in_batch = false;
                let events = mem::take(&mut self.pending);
                (!events.is_empty()).then_some(Reconcile::Apply(events))
            }
            Event::Reload => {
                self.pending.clear();
                self.stale = false;
                Some(Reconcile::Reload)
            }
            Event::Invalidate => {
                self.pending.clear();
                self.stale = true;
                None
            }
            Event::SectionUpdate(_) | Event::ObjectUpdate(_) if self.stale => None,
            Event::SectionUpdate(_) | Event::ObjectUpdate(_) if self.in_batch => {
                self.pending.push(event.clone());
                None
            }
            Event::SectionUpdate(_) | Event::ObjectUpdate(_) => {
                Some(Reconcile::Apply(vec![event.clone()]))
            }
        }
    }
}

/// Per-section object counts, kept in sync by replaying events.
///
/// Events do not say how many objects an inserted section holds, so a
/// replayed batch marks inserted and updated sections as fresh, ignores
/// object events inside them, and reads their sizes from the source once
/// the batch has been replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCounts {
    counts: Vec<usize>,
}

impl SectionCounts {
    /// Snapshot the counts of `source`.
    pub fn of<S: DataSource + ?Sized>(source: &S) -> Self {
        Self {
            counts: (0..source.sections_count())
                .map(|section| source.number_of_objects(section))
                .collect(),
        }
    }

    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Act on what an [`UpdateBuffer`] released.
    pub fn reconcile<S: DataSource + ?Sized>(&mut self, source: &S, reconcile: &Reconcile) {
        match reconcile {
            Reconcile::Reload => *self = Self::of(source),
            Reconcile::Apply(events) => {
                let mut fresh = vec![false; self.counts.len()];
                for event in events {
                    self.replay(event, &mut fresh);
                }
                for (index, _) in fresh.iter().enumerate().filter(|(_, fresh)| **fresh) {
                    self.counts[index] = source.number_of_objects(index);
                }
            }
        }
    }

    fn replay(&mut self, event: &Event, fresh: &mut Vec<bool>) {
        match event {
            Event::SectionUpdate(change) => self.replay_section(change, fresh),
            Event::ObjectUpdate(change) => self.replay_object(*change, fresh),
            _ => {}
        }
    }

    fn replay_section(&mut self, change: &SectionChange, fresh: &mut Vec<bool>) {
        match change.kind {
            ChangeType::Insert => {
                for &index in &change.indexes {
                    self.counts.insert(index, 0);
                    fresh.insert(index, true);
                }
            }
            ChangeType::Delete => {
                for &index in change.indexes.iter().rev() {
                    self.counts.remove(index);
                    fresh.remove(index);
                }
            }
            ChangeType::Update => {
                for &index in &change.indexes {
                    fresh[index] = true;
                }
            }
            ChangeType::Move => violation(ContractViolation::SectionMoveUnsupported),
        }
    }

    fn replay_object(&mut self, change: ObjectChange, fresh: &[bool]) {
        let removes = change.kind() != ChangeType::Update;
        if let Some(source) = change.source().filter(|path| removes && !fresh[path.section]) {
            self.counts[source.section] -= 1;
        }
        if let Some(target) = change.target().filter(|path| !fresh[path.section]) {
            self.counts[target.section] += 1;
        }
    }
}
