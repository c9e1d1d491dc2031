//! Metadata providers: Google Books, Open Library and the fallback chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shelf_kernel::settings::LookupSettings;

use super::identifier::IdentifierKey;
use super::ports::{BookMetadata, LookupError, MetadataLookup};

const USER_AGENT: &str = concat!("shelf/", env!("CARGO_PKG_VERSION"));

fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to create metadata HTTP client")
}

/// Build the production chain from settings.
pub fn from_settings(settings: &LookupSettings) -> anyhow::Result<FallbackLookup> {
    let timeout = Duration::from_millis(settings.timeout_ms);
    let primary = GoogleBooksLookup::new(&settings.google_books_base, timeout)?;
    let fallback = OpenLibraryLookup::new(&settings.open_library_base, timeout)?;
    Ok(FallbackLookup::new(Arc::new(primary), Arc::new(fallback)))
}

#[derive(Debug, Default, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    volume_info: VolumeInfo,
    #[serde(default)]
    search_info: Option<SearchInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: String,
    published_date: String,
    page_count: Option<u32>,
    description: String,
    language: String,
    categories: Vec<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchInfo {
    text_snippet: String,
}

impl From<Volume> for BookMetadata {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let title = match info.subtitle.filter(|s| !s.trim().is_empty()) {
            Some(subtitle) => format!("{}: {subtitle}", info.title),
            None => info.title,
        };
        BookMetadata {
            title,
            authors: info.authors,
            publisher: info.publisher,
            published_date: info.published_date,
            page_count: info.page_count,
            text_snippet: volume
                .search_info
                .map(|search| search.text_snippet)
                .unwrap_or_default(),
            description: info.description,
            language: info.language,
            thumbnail: info
                .image_links
                .and_then(|links| links.thumbnail.or(links.small_thumbnail)),
            categories: info.categories,
        }
    }
}

/// `volumes?q=` search term for an identifier.
fn google_query(id: &IdentifierKey, title_hint: Option<&str>) -> Option<String> {
    let mut query = match id {
        IdentifierKey::Issn(issn) => format!("issn:{issn}"),
        IdentifierKey::Invalid(_) => return None,
        _ => format!("isbn:{}", id.isbn13()?),
    };
    if let Some(hint) = title_hint {
        query.push_str(&format!(" intitle:{hint}"));
    }
    Some(query)
}

/// Google Books volumes API.
#[derive(Debug, Clone)]
pub struct GoogleBooksLookup {
    http: Client,
    base: String,
}

impl GoogleBooksLookup {
    const PROVIDER: &'static str = "google-books";

    pub fn new(base: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base: base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MetadataLookup for GoogleBooksLookup {
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError> {
        let Some(query) = google_query(id, title_hint) else {
            return Ok(None);
        };
        let transport = |source| LookupError::Transport {
            provider: Self::PROVIDER,
            source,
        };

        let response = self
            .http
            .get(format!("{}/volumes", self.base))
            .query(&[("q", query.as_str()), ("maxResults", "1")])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                provider: Self::PROVIDER,
                status: status.as_u16(),
            });
        }

        let volumes: VolumeList = response.json().await.map_err(transport)?;
        Ok(volumes.items.into_iter().next().map(BookMetadata::from))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenLibraryBook {
    title: String,
    subtitle: Option<String>,
    authors: Vec<Named>,
    publishers: Vec<Named>,
    publish_date: String,
    number_of_pages: Option<u32>,
    subjects: Vec<Named>,
    excerpts: Vec<Excerpt>,
    cover: Option<Cover>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Excerpt {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Cover {
    medium: Option<String>,
    small: Option<String>,
}

fn names(items: Vec<Named>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.name)
        .filter(|name| !name.is_empty())
        .collect()
}

impl From<OpenLibraryBook> for BookMetadata {
    fn from(book: OpenLibraryBook) -> Self {
        let title = match book.subtitle.filter(|s| !s.trim().is_empty()) {
            Some(subtitle) => format!("{}: {subtitle}", book.title),
            None => book.title,
        };
        BookMetadata {
            title,
            authors: names(book.authors),
            publisher: names(book.publishers).join(", "),
            published_date: book.publish_date,
            page_count: book.number_of_pages,
            text_snippet: book
                .excerpts
                .into_iter()
                .next()
                .map(|excerpt| excerpt.text)
                .unwrap_or_default(),
            description: String::new(),
            language: String::new(),
            thumbnail: book.cover.and_then(|cover| cover.medium.or(cover.small)),
            // Open Library subjects are long free-form lists; keep the first few.
            categories: names(book.subjects).into_iter().take(5).collect(),
        }
    }
}

/// Open Library books API. Serials are not indexed by ISSN there, so ISSN
/// lookups answer "no data" without a request.
#[derive(Debug, Clone)]
pub struct OpenLibraryLookup {
    http: Client,
    base: String,
}

impl OpenLibraryLookup {
    const PROVIDER: &'static str = "open-library";

    pub fn new(base: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base: base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MetadataLookup for OpenLibraryLookup {
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        _title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError> {
        let Some(isbn13) = id.isbn13() else {
            return Ok(None);
        };
        let bibkey = format!("ISBN:{isbn13}");
        let transport = |source| LookupError::Transport {
            provider: Self::PROVIDER,
            source,
        };

        let response = self
            .http
            .get(format!("{}/api/books", self.base))
            .query(&[
                ("bibkeys", bibkey.as_str()),
                ("format", "json"),
                ("jscmd", "data"),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                provider: Self::PROVIDER,
                status: status.as_u16(),
            });
        }

        let mut books: HashMap<String, OpenLibraryBook> =
            response.json().await.map_err(transport)?;
        Ok(books.remove(&bibkey).map(BookMetadata::from))
    }
}

/// Asks the primary provider first and the fallback when the primary fails
/// or has nothing usable.
#[derive(Clone)]
pub struct FallbackLookup {
    primary: Arc<dyn MetadataLookup>,
    fallback: Arc<dyn MetadataLookup>,
}

impl FallbackLookup {
    pub fn new(primary: Arc<dyn MetadataLookup>, fallback: Arc<dyn MetadataLookup>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl MetadataLookup for FallbackLookup {
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError> {
        let primary_error = match self.primary.fetch_by_identifier(id, title_hint).await {
            Ok(Some(metadata)) if !metadata.is_empty() => return Ok(Some(metadata)),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!(%id, %error, "primary metadata lookup failed");
                Some(error)
            }
        };

        match self.fallback.fetch_by_identifier(id, title_hint).await {
            Ok(Some(metadata)) if !metadata.is_empty() => Ok(Some(metadata)),
            Ok(_) => primary_error.map_or(Ok(None), Err),
            Err(error) => {
                tracing::warn!(%id, %error, "fallback metadata lookup failed");
                Err(primary_error.unwrap_or(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Canned {
        Found(&'static str),
        Nothing,
        Down(u16),
    }

    struct CannedLookup {
        answer: Canned,
        calls: AtomicUsize,
    }

    impl CannedLookup {
        fn new(answer: Canned) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataLookup for CannedLookup {
        async fn fetch_by_identifier(
            &self,
            _id: &IdentifierKey,
            _title_hint: Option<&str>,
        ) -> Result<Option<BookMetadata>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Canned::Found(title) => Ok(Some(BookMetadata {
                    title: title.to_string(),
                    ..BookMetadata::default()
                })),
                Canned::Nothing => Ok(None),
                Canned::Down(status) => Err(LookupError::Status {
                    provider: "canned",
                    status,
                }),
            }
        }
    }

    fn isbn() -> IdentifierKey {
        IdentifierKey::resolve("9780306406157")
    }

    #[tokio::test]
    async fn primary_hit_skips_fallback() {
        let primary = CannedLookup::new(Canned::Found("Primary"));
        let fallback = CannedLookup::new(Canned::Found("Fallback"));
        let chain = FallbackLookup::new(primary.clone(), fallback.clone());

        let found = chain.fetch_by_identifier(&isbn(), None).await.unwrap();
        assert_eq!(found.unwrap().title, "Primary");
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn primary_miss_or_failure_uses_fallback() {
        for answer in [Canned::Nothing, Canned::Down(503), Canned::Found("  ")] {
            let chain = FallbackLookup::new(
                CannedLookup::new(answer),
                CannedLookup::new(Canned::Found("Fallback")),
            );
            let found = chain.fetch_by_identifier(&isbn(), None).await.unwrap();
            assert_eq!(found.unwrap().title, "Fallback");
        }
    }

    #[tokio::test]
    async fn both_empty_is_no_data() {
        let chain = FallbackLookup::new(
            CannedLookup::new(Canned::Nothing),
            CannedLookup::new(Canned::Nothing),
        );
        assert_eq!(chain.fetch_by_identifier(&isbn(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn primary_error_surfaces_when_fallback_has_nothing() {
        let chain = FallbackLookup::new(
            CannedLookup::new(Canned::Down(500)),
            CannedLookup::new(Canned::Nothing),
        );
        let error = chain.fetch_by_identifier(&isbn(), None).await.unwrap_err();
        assert!(matches!(error, LookupError::Status { status: 500, .. }));
    }

    #[test]
    fn google_query_uses_canonical_forms() {
        let isbn10 = IdentifierKey::resolve("0306406152");
        assert_eq!(
            google_query(&isbn10, None).as_deref(),
            Some("isbn:9780306406157")
        );
        assert_eq!(
            google_query(&isbn10, Some("Signals")).as_deref(),
            Some("isbn:9780306406157 intitle:Signals")
        );
        let issn = IdentifierKey::resolve("0378-5955");
        assert_eq!(google_query(&issn, None).as_deref(), Some("issn:03785955"));
        assert_eq!(google_query(&IdentifierKey::resolve("nope"), None), None);
    }

    #[test]
    fn google_volume_maps_to_metadata() {
        let body = r#"{
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "Signals and Systems",
                    "subtitle": "Second Edition",
                    "authors": ["Alan V. Oppenheim", "Alan S. Willsky"],
                    "publisher": "Prentice Hall",
                    "publishedDate": "1997",
                    "pageCount": 957,
                    "language": "en",
                    "categories": ["Technology & Engineering"],
                    "imageLinks": {"smallThumbnail": "http://books.google.com/s.jpg"}
                },
                "searchInfo": {"textSnippet": "Fourier analysis"}
            }]
        }"#;
        let volumes: VolumeList = serde_json::from_str(body).unwrap();
        let metadata = BookMetadata::from(volumes.items.into_iter().next().unwrap());

        assert_eq!(metadata.title, "Signals and Systems: Second Edition");
        assert_eq!(metadata.authors.len(), 2);
        assert_eq!(metadata.page_count, Some(957));
        assert_eq!(metadata.text_snippet, "Fourier analysis");
        assert_eq!(
            metadata.thumbnail.as_deref(),
            Some("http://books.google.com/s.jpg")
        );
        assert!(metadata.description.is_empty());
    }

    #[test]
    fn empty_google_answer_has_no_items() {
        let volumes: VolumeList = serde_json::from_str(r#"{"totalItems": 0}"#).unwrap();
        assert!(volumes.items.is_empty());
    }

    #[test]
    fn open_library_record_maps_to_metadata() {
        let body = r#"{
            "ISBN:9780306406157": {
                "title": "Signals and Systems",
                "authors": [{"name": "Alan V. Oppenheim", "url": "https://openlibrary.org/a/1"}],
                "publishers": [{"name": "Prentice Hall"}],
                "publish_date": "1997",
                "number_of_pages": 957,
                "subjects": [{"name": "Signal theory"}],
                "cover": {"small": "https://covers.openlibrary.org/s.jpg",
                          "medium": "https://covers.openlibrary.org/m.jpg"}
            }
        }"#;
        let mut books: HashMap<String, OpenLibraryBook> = serde_json::from_str(body).unwrap();
        let metadata = BookMetadata::from(books.remove("ISBN:9780306406157").unwrap());

        assert_eq!(metadata.title, "Signals and Systems");
        assert_eq!(metadata.authors, vec!["Alan V. Oppenheim".to_string()]);
        assert_eq!(metadata.publisher, "Prentice Hall");
        assert_eq!(metadata.categories, vec!["Signal theory".to_string()]);
        assert_eq!(
            metadata.thumbnail.as_deref(),
            Some("https://covers.openlibrary.org/m.jpg")
        );
    }
}
