#![forbid(unsafe_code)]

//! Change events broadcast by every data source.
//!
//! An [`Event`] describes exactly one observable change. Structural events
//! ([`Event::SectionUpdate`], [`Event::ObjectUpdate`]) carry coordinates in
//! the state *after* the change was applied, except for deletions and move
//! sources, which name the position the object occupied before.
//!
//! # Batches
//!
//! Events delivered between [`Event::WillBeginUpdate`] and
//! [`Event::DidEndUpdate`] form one logical operation. A consumer that needs
//! final counts must buffer them and apply the lot at `DidEndUpdate`.

use std::collections::BTreeSet;
use std::fmt;

use crate::index_path::IndexPath;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Insert,
    Delete,
    Move,
    Update,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Update => "update",
        })
    }
}

/// A change to one or more whole sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionChange {
    pub kind: ChangeType,
    pub indexes: BTreeSet<usize>,
}

impl SectionChange {
    #[must_use]
    pub fn new(kind: ChangeType, indexes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            kind,
            indexes: indexes.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn insert(index: usize) -> Self {
        Self::new(ChangeType::Insert, [index])
    }

    #[must_use]
    pub fn delete(index: usize) -> Self {
        Self::new(ChangeType::Delete, [index])
    }

    #[must_use]
    pub fn update(index: usize) -> Self {
        Self::new(ChangeType::Update, [index])
    }
}

/// A change to a single object.
///
/// Each variant carries exactly the coordinates its kind needs: deletes and
/// updates name a `source`, inserts a `target`, and moves both. For a move
/// the target is measured after the source has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectChange {
    Insert { target: IndexPath },
    Delete { source: IndexPath },
    Move { source: IndexPath, target: IndexPath },
    Update { source: IndexPath },
}

impl ObjectChange {
    #[must_use]
    pub const fn kind(&self) -> ChangeType {
        match self {
            Self::Insert { .. } => ChangeType::Insert,
            Self::Delete { .. } => ChangeType::Delete,
            Self::Move { .. } => ChangeType::Move,
            Self::Update { .. } => ChangeType::Update,
        }
    }

    /// Position before the change. `None` for inserts.
    #[must_use]
    pub const fn source(&self) -> Option<IndexPath> {
        match *self {
            Self::Insert { .. } => None,
            Self::Delete { source } | Self::Move { source, .. } | Self::Update { source } => {
                Some(source)
            }
        }
    }

    /// Position after the change. `None` for deletes and updates.
    #[must_use]
    pub const fn target(&self) -> Option<IndexPath> {
        match *self {
            Self::Insert { target } | Self::Move { target, .. } => Some(target),
            Self::Delete { .. } | Self::Update { .. } => None,
        }
    }
}

/// One observable change of a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// State is stale; the next read recomputes it.
    Invalidate,
    /// State was replaced wholesale; resynchronize from current counts.
    Reload,
    WillBeginUpdate,
    DidEndUpdate,
    SectionUpdate(SectionChange),
    ObjectUpdate(ObjectChange),
}

impl Event {
    /// Whether this event describes a section or object mutation.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::SectionUpdate(_) | Self::ObjectUpdate(_))
    }
}
