#![forbid(unsafe_code)]

//! Data source implementations.
//!
//! - [`ArrayDataSource`]: owned, mutable storage and the write surface of
//!   the system. Every structural mutation emits an event; mutations can be
//!   grouped into batches.
//! - [`MappingDataSource`]: a read-only projection of any other source that
//!   maps objects lazily, caches them per index, and invalidates only the
//!   slots an upstream change touched.
//! - [`UpdateBuffer`] and [`SectionCounts`]: the consumer side of the batch
//!   protocol, for adapters that reconcile a list against the event stream.

pub mod array;
pub mod batch;
pub mod buffer;
pub mod mapping;

pub use array::{ArrayDataSource, Resolver};
pub use buffer::{Reconcile, SectionCounts, UpdateBuffer};
pub use mapping::{MappingDataSource, MappingSection};
