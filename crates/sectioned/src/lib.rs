#![forbid(unsafe_code)]

//! Observable sectioned collections.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use sectioned::prelude::*;
//!
//! let people = ArrayDataSource::from_nested(|| vec![vec!["ada", "grace"], vec!["linus"]]);
//! let shouting = MappingDataSource::new(&people, |name: &str| name.to_uppercase());
//!
//! assert_eq!(shouting.sections_count(), 2);
//! assert_eq!(shouting.object_at(IndexPath::new(1, 0)), "LINUS");
//! ```

pub use sectioned_core as core;
pub use sectioned_store as store;

pub mod prelude {
    pub use sectioned_core::{
        ArraySection, ChangeType, ContractViolation, DataSource, Event, IndexPath, ObjectChange,
        Section, SectionChange, SectionInfo, SourceConfig, Subscription,
    };
    pub use sectioned_store::{
        ArrayDataSource, MappingDataSource, MappingSection, Reconcile, SectionCounts,
        UpdateBuffer,
    };
}
