//! Command handlers. Each one performs at most one store read followed by at
//! most one store write.

use std::num::NonZeroUsize;
use std::sync::Arc;

use rust_decimal::Decimal;
use shelf_authz::Role;
use shelf_db::{AggregateColumn, AggregateOp, BookQuery, BookRecord, CatalogKey, CatalogStore};

use super::batcher::{DeliveryReport, ResultBatcher};
use super::command::{Command, CommandTable, EditCommand, Field};
use super::error::CatalogError;
use super::identifier::IdentifierKey;
use super::messages;
use super::ports::{BookMetadata, ChatId, MetadataLookup};

/// Result of a successful handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// One message still to be sent by the caller.
    Text(String),
    /// Rows already sent through the batcher.
    Delivered(DeliveryReport),
}

/// Catalog-wide figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Total {
    Books,
    Value,
    Pages,
}

/// Page sizes for batched replies.
#[derive(Debug, Clone, Copy)]
pub struct BatchSizes {
    pub list: NonZeroUsize,
    pub detail: NonZeroUsize,
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            list: NonZeroUsize::new(25).unwrap_or(NonZeroUsize::MIN),
            detail: NonZeroUsize::MIN,
        }
    }
}

/// Resolve `raw`, rejecting tokens that match no identifier format.
fn resolve(raw: &str) -> Result<(IdentifierKey, CatalogKey), CatalogError> {
    let identifier = IdentifierKey::resolve(raw);
    match identifier.catalog_key() {
        Some(key) => Ok((identifier, key)),
        None => Err(CatalogError::InvalidIdentifier(raw.to_string())),
    }
}

/// Initial record for `identifier`, keeping ISBN-10 and ISBN-13 consistent.
fn new_record(identifier: &IdentifierKey) -> BookRecord {
    BookRecord {
        isbn10: identifier.isbn10().map(str::to_string),
        isbn13: identifier.isbn13().map(str::to_string),
        issn: identifier.issn().map(str::to_string),
        ..BookRecord::default()
    }
}

fn record_from_metadata(identifier: &IdentifierKey, metadata: BookMetadata) -> BookRecord {
    BookRecord {
        title: metadata.title,
        authors: metadata.authors.join(", "),
        publisher: metadata.publisher,
        published_date: metadata.published_date,
        page_count: metadata.page_count.filter(|pages| *pages > 0),
        text_snippet: metadata.text_snippet,
        description: metadata.description,
        language: metadata.language,
        thumbnail: metadata.thumbnail,
        categories: metadata.categories.join(", "),
        ..new_record(identifier)
    }
}

/// Catalog operations behind the chat commands.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    lookup: Arc<dyn MetadataLookup>,
    batcher: ResultBatcher,
    table: Arc<CommandTable>,
    sizes: BatchSizes,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        lookup: Arc<dyn MetadataLookup>,
        batcher: ResultBatcher,
        table: Arc<CommandTable>,
        sizes: BatchSizes,
    ) -> Self {
        Self {
            store,
            lookup,
            batcher,
            table,
            sizes,
        }
    }

    async fn find(&self, key: &CatalogKey) -> Result<Option<BookRecord>, CatalogError> {
        let rows = self.store.query(&BookQuery::ByKey(key.clone())).await?;
        Ok(rows.into_iter().next())
    }

    /// `/add <id> [title hint]`: look the book up and store it.
    pub async fn add(&self, raw_id: &str, title_hint: &str) -> Result<Reply, CatalogError> {
        let (identifier, key) = resolve(raw_id)?;
        if self.find(&key).await?.is_some() {
            return Ok(Reply::Text(messages::already_present(&key)));
        }

        let hint = Some(title_hint.trim()).filter(|hint| !hint.is_empty());
        let metadata = match self.lookup.fetch_by_identifier(&identifier, hint).await {
            Ok(Some(metadata)) if !metadata.is_empty() => metadata,
            Ok(_) => {
                return Err(CatalogError::LookupFailed {
                    identifier: identifier.to_string(),
                    source: None,
                })
            }
            Err(error) => {
                return Err(CatalogError::LookupFailed {
                    identifier: identifier.to_string(),
                    source: Some(error),
                })
            }
        };

        let record = record_from_metadata(&identifier, metadata);
        self.store.upsert(&record).await?;
        tracing::info!(%key, title = %record.title, "book added");
        Ok(Reply::Text(messages::added(&record)))
    }

    /// `/addmanual <id> <title>`: store a record without a metadata lookup.
    pub async fn add_manual(&self, raw_id: &str, title: &str) -> Result<Reply, CatalogError> {
        let (identifier, key) = resolve(raw_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::MissingArgument(Command::Edit(
                EditCommand::AddManual,
            )));
        }
        if self.find(&key).await?.is_some() {
            return Ok(Reply::Text(messages::already_present(&key)));
        }

        let record = BookRecord {
            title: title.to_string(),
            ..new_record(&identifier)
        };
        self.store.upsert(&record).await?;
        tracing::info!(%key, title = %record.title, "book added manually");
        Ok(Reply::Text(messages::added(&record)))
    }

    pub async fn delete(&self, raw_id: &str) -> Result<Reply, CatalogError> {
        let (_, key) = resolve(raw_id)?;
        if !self.store.delete(&key).await? {
            return Err(CatalogError::NotFound(key));
        }
        tracing::info!(%key, "book deleted");
        Ok(Reply::Text(messages::deleted(&key)))
    }

    /// Setter commands: overwrite one field of an existing record.
    pub async fn set_field(
        &self,
        field: Field,
        raw_id: &str,
        value: &str,
    ) -> Result<Reply, CatalogError> {
        let (_, key) = resolve(raw_id)?;
        if value.trim().is_empty() {
            return Err(CatalogError::MissingArgument(Command::Edit(
                EditCommand::Set(field),
            )));
        }
        let mut record = self
            .find(&key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.clone()))?;

        field.apply(&mut record, value)?;
        self.store.upsert(&record).await?;
        tracing::info!(%key, field = field.label(), "book updated");
        Ok(Reply::Text(messages::updated(field, &key)))
    }

    pub fn start(&self, role: Role) -> Reply {
        Reply::Text(messages::welcome(role))
    }

    pub fn help(&self, role: Role) -> Reply {
        Reply::Text(messages::help(&self.table, role))
    }

    /// `/show <id>`: full record, one record per message.
    pub async fn show(&self, chat: ChatId, raw_id: &str) -> Result<Reply, CatalogError> {
        let (_, key) = resolve(raw_id)?;
        let rows = self.store.query(&BookQuery::ByKey(key.clone())).await?;
        if rows.is_empty() {
            return Err(CatalogError::NotFound(key));
        }
        let report = self
            .batcher
            .deliver(chat, &rows, self.sizes.detail, messages::detail)
            .await;
        Ok(Reply::Delivered(report))
    }

    /// Listing commands: one summary line per record, paginated.
    pub async fn list(&self, chat: ChatId, query: BookQuery) -> Result<Reply, CatalogError> {
        let rows = self.store.query(&query).await?;
        let report = self
            .batcher
            .deliver(chat, &rows, self.sizes.list, messages::summary)
            .await;
        Ok(Reply::Delivered(report))
    }

    pub async fn total(&self, total: Total) -> Result<Reply, CatalogError> {
        let (column, op, render): (_, _, fn(Decimal) -> String) = match total {
            Total::Books => (AggregateColumn::Rows, AggregateOp::Count, messages::count),
            Total::Value => (AggregateColumn::Price, AggregateOp::Sum, messages::value),
            Total::Pages => (
                AggregateColumn::PageCount,
                AggregateOp::Sum,
                messages::pages_total,
            ),
        };
        let figure = self.store.aggregate(column, op).await?;
        Ok(Reply::Text(render(figure)))
    }
}
