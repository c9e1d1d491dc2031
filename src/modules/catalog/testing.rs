//! In-process doubles for the catalog ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shelf_db::{
    AggregateColumn, AggregateOp, BookQuery, BookRecord, CatalogKey, CatalogStore,
    InMemoryCatalogStore, StoreResult,
};

use super::identifier::IdentifierKey;
use super::ports::{BookMetadata, ChatId, LookupError, Messenger, MessengerError, MetadataLookup};

/// Messenger that keeps every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, String)>>,
    fail: bool,
}

impl RecordingMessenger {
    /// Records messages but reports every send as rejected.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn chats(&self) -> Vec<ChatId> {
        self.sent.lock().unwrap().iter().map(|(chat, _)| *chat).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), MessengerError> {
        self.sent.lock().unwrap().push((chat, text.to_string()));
        if self.fail {
            return Err(MessengerError::Rejected {
                status: 429,
                body: "Too Many Requests".to_string(),
            });
        }
        Ok(())
    }
}

/// Lookup answering from a fixed table keyed by canonical identifier.
#[derive(Debug, Default)]
pub struct StaticLookup {
    books: HashMap<String, BookMetadata>,
    calls: AtomicUsize,
}

impl StaticLookup {
    pub fn with(mut self, canonical: &str, title: &str) -> Self {
        self.books.insert(
            canonical.to_string(),
            BookMetadata {
                title: title.to_string(),
                authors: vec!["A. Author".to_string()],
                ..BookMetadata::default()
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for StaticLookup {
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        _title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(id.canonical().and_then(|key| self.books.get(key).cloned()))
    }
}

/// In-memory store that counts every operation it serves.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryCatalogStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.reads() + self.writes()
    }
}

#[async_trait]
impl CatalogStore for CountingStore {
    async fn upsert(&self, record: &BookRecord) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(record).await
    }

    async fn delete(&self, key: &CatalogKey) -> StoreResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }

    async fn query(&self, query: &BookQuery) -> StoreResult<Vec<BookRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.query(query).await
    }

    async fn aggregate(&self, column: AggregateColumn, op: AggregateOp) -> StoreResult<Decimal> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.aggregate(column, op).await
    }
}
