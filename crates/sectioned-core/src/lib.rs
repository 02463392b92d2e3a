#![forbid(unsafe_code)]

//! Core: index paths, change events, observer sets, and the section and
//! data-source contracts shared by every sectioned collection.

pub mod config;
pub mod error;
pub mod event;
pub mod index_path;
pub mod observer;
pub mod section;
pub mod source;

pub use config::SourceConfig;
pub use error::{ContractViolation, Enforce, violation};
pub use event::{ChangeType, Event, ObjectChange, SectionChange};
pub use index_path::IndexPath;
pub use observer::{ObserverSet, Subscription};
pub use section::{ArraySection, Section, SectionInfo, UserInfo};
pub use source::DataSource;
