#![forbid(unsafe_code)]

//! Two-level `(section, item)` coordinates.

use std::fmt;

/// Coordinate of one object: the section it lives in and its position there.
///
/// Ordering is section-major, so sorting index paths yields the same order
/// a linear section-then-item scan visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    #[must_use]
    pub const fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }

    /// Same section, different item.
    #[must_use]
    pub const fn with_item(self, item: usize) -> Self {
        Self {
            section: self.section,
            item,
        }
    }
}

impl From<(usize, usize)> for IndexPath {
    fn from((section, item): (usize, usize)) -> Self {
        Self::new(section, item)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_section_major() {
        let mut paths = vec![
            IndexPath::new(1, 0),
            IndexPath::new(0, 3),
            IndexPath::new(0, 1),
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![
                IndexPath::new(0, 1),
                IndexPath::new(0, 3),
                IndexPath::new(1, 0)
            ]
        );
    }

    #[test]
    fn from_tuple_and_display() {
        let path: IndexPath = (2, 5).into();
        assert_eq!(path, IndexPath::new(2, 5));
        assert_eq!(path.to_string(), "[2, 5]");
        assert_eq!(path.with_item(0), IndexPath::new(2, 0));
    }
}
