//! In-memory catalog engine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::model::{BookRecord, CatalogKey};
use crate::store::{
    AggregateColumn, AggregateOp, BookQuery, CatalogStore, StoreError, StoreResult,
};

/// Thread-safe in-memory catalog keyed by canonical key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    records: Arc<RwLock<HashMap<CatalogKey, BookRecord>>>,
}

impl InMemoryCatalogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// Whether the store holds no record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(err: impl ToString) -> StoreError {
    StoreError::unavailable(std::io::Error::other(err.to_string()))
}

fn title_order(left: &BookRecord, right: &BookRecord) -> std::cmp::Ordering {
    left.title
        .to_lowercase()
        .cmp(&right.title.to_lowercase())
        .then_with(|| left.key().cmp(&right.key()))
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn upsert(&self, record: &BookRecord) -> StoreResult<()> {
        let key = record.key().ok_or(StoreError::MissingKey)?;
        let mut records = self.records.write().map_err(poisoned)?;
        let replaced = records.insert(key.clone(), record.clone()).is_some();
        tracing::debug!(target: "shelf-db", %key, replaced, "record upserted");
        Ok(())
    }

    async fn delete(&self, key: &CatalogKey) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        let removed = records.remove(key).is_some();
        tracing::debug!(target: "shelf-db", %key, removed, "record delete");
        Ok(removed)
    }

    async fn query(&self, query: &BookQuery) -> StoreResult<Vec<BookRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut rows: Vec<BookRecord> = match query {
            BookQuery::ByKey(key) => records.get(key).cloned().into_iter().collect(),
            _ => records
                .values()
                .filter(|record| query.matches(record))
                .cloned()
                .collect(),
        };
        rows.sort_by(title_order);
        Ok(rows)
    }

    async fn aggregate(&self, column: AggregateColumn, op: AggregateOp) -> StoreResult<Decimal> {
        let records = self.records.read().map_err(poisoned)?;
        let values = records.values();
        let result = match (column, op) {
            (AggregateColumn::Rows, AggregateOp::Count) => Decimal::from(records.len()),
            (AggregateColumn::Rows, AggregateOp::Sum) => {
                return Err(StoreError::UnsupportedAggregate { column, op })
            }
            (AggregateColumn::Price, AggregateOp::Count) => {
                Decimal::from(values.filter(|record| record.price.is_some()).count())
            }
            (AggregateColumn::Price, AggregateOp::Sum) => {
                checked_sum(column, values.filter_map(|record| record.price))?
            }
            (AggregateColumn::PageCount, AggregateOp::Count) => {
                Decimal::from(values.filter(|record| record.page_count.is_some()).count())
            }
            (AggregateColumn::PageCount, AggregateOp::Sum) => checked_sum(
                column,
                values
                    .filter_map(|record| record.page_count)
                    .map(Decimal::from),
            )?,
        };
        Ok(result)
    }
}

fn checked_sum(
    column: AggregateColumn,
    mut values: impl Iterator<Item = Decimal>,
) -> StoreResult<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value)
            .ok_or(StoreError::Overflow { column })
    })
}
