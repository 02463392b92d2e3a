//! Contract violations.
//!
//! Every failure in this workspace is a caller bug: an index outside the
//! current bounds, unbalanced batch brackets, an unsupported section move.
//! There is no I/O and nothing to retry, so mutating operations check their
//! preconditions up front and abort through [`violation`] before touching
//! any state. Checked reads (`try_*`) hand the same value back as an error
//! for boundary code that prefers to report rather than crash.

use thiserror::Error;

use crate::index_path::IndexPath;

pub type Result<T> = std::result::Result<T, ContractViolation>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("section index {index} out of bounds (sections: {count})")]
    SectionOutOfBounds { index: usize, count: usize },

    #[error("item index {index_path} out of bounds (objects in section: {count})")]
    ItemOutOfBounds { index_path: IndexPath, count: usize },

    #[error("begin_update called while an update is already in progress")]
    NestedBeginUpdate,

    #[error("end_update called without a matching begin_update")]
    EndUpdateWithoutBegin,

    #[error("observer set enabled more times than it was disabled")]
    EnableUnderflow,

    #[error("section move is not supported")]
    SectionMoveUnsupported,
}

impl ContractViolation {
    /// Bounds check for positional reads, replaces, and removals.
    pub fn check_section(index: usize, count: usize) -> Result<()> {
        if index < count {
            Ok(())
        } else {
            Err(Self::SectionOutOfBounds { index, count })
        }
    }

    /// Bounds check for a position that addresses an existing object.
    pub fn check_item(index_path: IndexPath, count: usize) -> Result<()> {
        if index_path.item < count {
            Ok(())
        } else {
            Err(Self::ItemOutOfBounds { index_path, count })
        }
    }

    /// Bounds check for an insertion point (`count` itself is valid).
    pub fn check_insertion(index_path: IndexPath, count: usize) -> Result<()> {
        if index_path.item <= count {
            Ok(())
        } else {
            Err(Self::ItemOutOfBounds { index_path, count })
        }
    }
}

/// Abort the current operation with a diagnostic naming the violation.
#[track_caller]
pub fn violation(violation: ContractViolation) -> ! {
    panic!("contract violation: {violation}")
}

/// Unwrap a precondition check or abort with its diagnostic.
pub trait Enforce<T> {
    fn enforce(self) -> T;
}

impl<T> Enforce<T> for Result<T> {
    #[track_caller]
    fn enforce(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => violation(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_checks() {
        assert!(ContractViolation::check_section(0, 1).is_ok());
        assert_eq!(
            ContractViolation::check_section(1, 1),
            Err(ContractViolation::SectionOutOfBounds { index: 1, count: 1 })
        );
        let path = IndexPath::new(0, 3);
        assert!(ContractViolation::check_insertion(path, 3).is_ok());
        assert!(ContractViolation::check_item(path, 3).is_err());
    }

    #[test]
    fn display_names_the_violation() {
        let err = ContractViolation::ItemOutOfBounds {
            index_path: IndexPath::new(1, 4),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "item index [1, 4] out of bounds (objects in section: 2)"
        );
    }

    #[test]
    #[should_panic(expected = "contract violation: section move is not supported")]
    fn violation_panics_with_diagnostic() {
        violation(ContractViolation::SectionMoveUnsupported);
    }
}
