//! Catalog persistence boundary.
//!
//! The service talks to storage only through [`CatalogStore`], whose four
//! operations (`upsert`, `delete`, `query`, `aggregate`) are independent of the
//! backing engine. [`InMemoryCatalogStore`] is the engine shipped with the
//! workspace.

pub mod memory;
pub mod model;
pub mod store;

pub use memory::InMemoryCatalogStore;
pub use model::{BookRecord, CatalogKey};
pub use store::{AggregateColumn, AggregateOp, BookQuery, CatalogStore, StoreError, StoreResult};
