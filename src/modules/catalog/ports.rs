//! Outbound collaborators of the catalog bot.

use async_trait::async_trait;
use thiserror::Error;

use super::identifier::IdentifierKey;

/// Chat the reply is delivered to.
pub type ChatId = i64;

/// Outbound chat channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends one text message.
    ///
    /// Delivery is fire-and-forget for callers: errors are logged by the
    /// caller, never retried.
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), MessengerError>;
}

/// Errors raised by messenger adapters.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("message transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("message rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Bibliographic data returned by a metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: String,
    pub published_date: String,
    pub page_count: Option<u32>,
    pub text_snippet: String,
    pub description: String,
    pub language: String,
    pub thumbnail: Option<String>,
    pub categories: Vec<String>,
}

impl BookMetadata {
    /// A provider answer is usable only when it names the book.
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
    }
}

/// External bibliographic lookup.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Fetches metadata for a resolved identifier. `Ok(None)` means the
    /// provider has no data, which is not an error.
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError>;
}

/// Errors raised by metadata providers.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} answered with status {status}")]
    Status { provider: &'static str, status: u16 },
}
