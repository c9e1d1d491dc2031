//! Store port.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{BookRecord, CatalogKey};

/// Result type for catalog store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Row selection for [`CatalogStore::query`]. Text predicates match
/// case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookQuery {
    ByKey(CatalogKey),
    TitleContains(String),
    AuthorContains(String),
    PublisherContains(String),
    LocationContains(String),
    CategoryContains(String),
    Favorites,
    All,
}

impl BookQuery {
    /// Evaluate the predicate against one record.
    pub fn matches(&self, record: &BookRecord) -> bool {
        match self {
            BookQuery::ByKey(key) => record.matches_key(key),
            BookQuery::TitleContains(needle) => contains_ignore_case(&record.title, needle),
            BookQuery::AuthorContains(needle) => contains_ignore_case(&record.authors, needle),
            BookQuery::PublisherContains(needle) => {
                contains_ignore_case(&record.publisher, needle)
            }
            BookQuery::LocationContains(needle) => contains_ignore_case(&record.location, needle),
            BookQuery::CategoryContains(needle) => {
                contains_ignore_case(&record.categories, needle)
            }
            BookQuery::Favorites => record.is_favorite,
            BookQuery::All => true,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Column an aggregate is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateColumn {
    Rows,
    Price,
    PageCount,
}

/// Aggregate function. `Count` counts records with a value in the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
}

/// Catalog persistence contract.
///
/// Every command issues at most one read followed by at most one write; the
/// store provides per-operation consistency only.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts the record or replaces the record with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingKey`] when the record has neither ISBN-13
    /// nor ISSN.
    async fn upsert(&self, record: &BookRecord) -> StoreResult<()>;

    /// Removes the record addressed by `key`, returning whether one existed.
    async fn delete(&self, key: &CatalogKey) -> StoreResult<bool>;

    /// Returns matching records ordered by title, then key.
    async fn query(&self, query: &BookQuery) -> StoreResult<Vec<BookRecord>>;

    /// Computes a scalar over all records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedAggregate`] for `Sum` over `Rows`
    /// and [`StoreError::Overflow`] when a sum does not fit a `Decimal`.
    async fn aggregate(&self, column: AggregateColumn, op: AggregateOp) -> StoreResult<Decimal>;
}

/// Errors returned by catalog store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The record carries no canonical key.
    #[error("record has neither an ISBN-13 nor an ISSN")]
    MissingKey,

    /// The engine cannot compute the requested aggregate.
    #[error("unsupported aggregate {op:?} over {column:?}")]
    UnsupportedAggregate {
        column: AggregateColumn,
        op: AggregateOp,
    },

    /// A sum left the range of the aggregate's numeric type.
    #[error("{column:?} sum overflowed")]
    Overflow { column: AggregateColumn },

    /// Storage-engine failure.
    #[error("catalog store unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps an engine error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
