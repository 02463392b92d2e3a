#![forbid(unsafe_code)]

//! Sections: ordered runs of objects plus optional metadata.
//!
//! [`Section`] is the read capability shared by every section kind.
//! [`ArraySection`] owns its objects; mapping sections (in the store crate)
//! derive theirs lazily from an origin. [`SectionInfo`] is an owned snapshot
//! of a section's metadata, handed out by data sources that keep their
//! sections behind interior mutability.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{ContractViolation, Enforce};
use crate::index_path::IndexPath;

/// Arbitrary annotations attached to a section.
pub type UserInfo = AHashMap<String, Rc<dyn Any>>;

/// Read capability of a section.
pub trait Section {
    fn name(&self) -> Option<String>;

    fn user_info(&self) -> Option<UserInfo>;

    fn number_of_objects(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.number_of_objects() == 0
    }
}

/// Owned snapshot of a section's metadata and size.
#[derive(Clone, Default)]
pub struct SectionInfo {
    pub name: Option<String>,
    pub user_info: Option<UserInfo>,
    pub number_of_objects: usize,
}

impl SectionInfo {
    #[must_use]
    pub fn of(section: &dyn Section) -> Self {
        Self {
            name: section.name(),
            user_info: section.user_info(),
            number_of_objects: section.number_of_objects(),
        }
    }
}

impl fmt::Debug for SectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionInfo")
            .field("name", &self.name)
            .field(
                "user_info_keys",
                &self.user_info.as_ref().map(|info| info.len()),
            )
            .field("number_of_objects", &self.number_of_objects)
            .finish()
    }
}

impl Section for SectionInfo {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn user_info(&self) -> Option<UserInfo> {
        self.user_info.clone()
    }

    fn number_of_objects(&self) -> usize {
        self.number_of_objects
    }
}

/// A section that owns its objects.
///
/// Mutating a section directly emits nothing; sections owned by a data
/// source are only mutated through it, which pairs every change with an
/// event. Out-of-range positions abort with a contract violation.
#[derive(Clone, Default)]
pub struct ArraySection<T> {
    objects: Vec<T>,
    name: Option<String>,
    user_info: Option<UserInfo>,
}

impl<T: fmt::Debug> fmt::Debug for ArraySection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArraySection")
            .field("name", &self.name)
            .field("objects", &self.objects)
            .finish_non_exhaustive()
    }
}

impl<T> ArraySection<T> {
    #[must_use]
    pub fn new(objects: Vec<T>) -> Self {
        Self {
            objects,
            name: None,
            user_info: None,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, objects: Vec<T>) -> Self {
        Self::new(objects).with_name(name)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_user_info(mut self, user_info: UserInfo) -> Self {
        self.user_info = Some(user_info);
        self
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn set_user_info(&mut self, user_info: Option<UserInfo>) {
        self.user_info = user_info;
    }

    #[must_use]
    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.objects.get(index)
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    #[track_caller]
    pub fn object_at(&self, index: usize) -> &T {
        self.check(index);
        &self.objects[index]
    }

    /// Insert at `index`, shifting `[index, len)` right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    #[track_caller]
    pub fn insert(&mut self, object: T, index: usize) {
        ContractViolation::check_insertion(IndexPath::new(0, index), self.objects.len())
            .enforce();
        self.objects.insert(index, object);
    }

    /// Remove at `index`, shifting `(index, len)` left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        self.check(index);
        self.objects.remove(index)
    }

    /// Replace the object at `index`, returning the previous one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[track_caller]
    pub fn replace(&mut self, index: usize, object: T) -> T {
        self.check(index);
        std::mem::replace(&mut self.objects[index], object)
    }

    #[must_use]
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.objects.iter().position(predicate)
    }

    #[track_caller]
    fn check(&self, index: usize) {
        ContractViolation::check_item(IndexPath::new(0, index), self.objects.len()).enforce();
    }
}

impl<T: PartialEq> ArraySection<T> {
    /// Position of the first object equal to `object`.
    #[must_use]
    pub fn index_of(&self, object: &T) -> Option<usize> {
        self.position(|candidate| candidate == object)
    }
}

impl<T> From<Vec<T>> for ArraySection<T> {
    fn from(objects: Vec<T>) -> Self {
        Self::new(objects)
    }
}

impl<T> FromIterator<T> for ArraySection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> Section for ArraySection<T> {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn user_info(&self) -> Option<UserInfo> {
        self.user_info.clone()
    }

    fn number_of_objects(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_shifts_right_and_remove_shifts_left() {
        let mut section = ArraySection::new(vec!['a', 'b', 'c']);
        section.insert('x', 1);
        assert_eq!(section.objects(), &['a', 'x', 'b', 'c']);

        assert_eq!(section.remove(0), 'a');
        assert_eq!(section.objects(), &['x', 'b', 'c']);

        section.insert('z', 3);
        assert_eq!(section.objects(), &['x', 'b', 'c', 'z']);
    }

    #[test]
    fn replace_returns_previous() {
        let mut section = ArraySection::new(vec![1, 2]);
        assert_eq!(section.replace(1, 20), 2);
        assert_eq!(section.objects(), &[1, 20]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn insert_past_end_panics() {
        let mut section = ArraySection::new(vec![1]);
        section.insert(2, 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn remove_out_of_range_panics() {
        let mut section = ArraySection::<i32>::new(vec![]);
        section.remove(0);
    }

    #[test]
    fn metadata_and_search() {
        let mut info = UserInfo::default();
        info.insert("badge".to_string(), Rc::new(3u32));
        let section = ArraySection::named("fruits", vec!["apple", "pear", "apple"])
            .with_user_info(info);

        assert_eq!(Section::name(&section).as_deref(), Some("fruits"));
        assert_eq!(section.index_of(&"apple"), Some(0));
        assert_eq!(section.index_of(&"plum"), None);

        let snapshot = SectionInfo::of(&section);
        assert_eq!(snapshot.number_of_objects, 3);
        let badge = snapshot
            .user_info
            .as_ref()
            .and_then(|info| info.get("badge"))
            .and_then(|value| value.downcast_ref::<u32>())
            .copied();
        assert_eq!(badge, Some(3));
    }

    #[test]
    fn collects_from_iterator() {
        let section: ArraySection<i32> = (1..=3).collect();
        assert_eq!(section.number_of_objects(), 3);
        assert!(!Section::is_empty(&section));
        assert!(Section::is_empty(&ArraySection::<i32>::default()));
    }
}
