//! Book record as stored in the catalog.

use std::fmt;

use rust_decimal::Decimal;

/// Authoritative lookup key of a record: the ISBN-13 when the record has one,
/// otherwise its ISSN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogKey {
    Isbn13(String),
    Issn(String),
}

impl CatalogKey {
    /// Raw identifier value.
    pub fn as_str(&self) -> &str {
        match self {
            CatalogKey::Isbn13(value) | CatalogKey::Issn(value) => value,
        }
    }
}

impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKey::Isbn13(value) => write!(f, "ISBN {value}"),
            CatalogKey::Issn(value) => write!(f, "ISSN {value}"),
        }
    }
}

/// One catalogued publication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookRecord {
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub issn: Option<String>,
    pub title: String,
    pub authors: String,
    pub publisher: String,
    pub published_date: String,
    /// Always positive when present.
    pub page_count: Option<u32>,
    pub text_snippet: String,
    pub description: String,
    pub language: String,
    pub location: String,
    /// Never negative when present.
    pub price: Option<Decimal>,
    pub thumbnail: Option<String>,
    pub is_favorite: bool,
    pub categories: String,
}

impl BookRecord {
    /// Canonical key of the record, `None` for a record without ISBN-13 or ISSN.
    pub fn key(&self) -> Option<CatalogKey> {
        match (&self.isbn13, &self.issn) {
            (Some(isbn13), _) => Some(CatalogKey::Isbn13(isbn13.clone())),
            (None, Some(issn)) => Some(CatalogKey::Issn(issn.clone())),
            (None, None) => None,
        }
    }

    /// Whether the record is the one addressed by `key`.
    pub fn matches_key(&self, key: &CatalogKey) -> bool {
        self.key().as_ref() == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn13_is_authoritative_over_issn() {
        let record = BookRecord {
            isbn13: Some("9780306406157".to_string()),
            issn: Some("03785955".to_string()),
            ..BookRecord::default()
        };
        assert_eq!(
            record.key(),
            Some(CatalogKey::Isbn13("9780306406157".to_string()))
        );
    }

    #[test]
    fn issn_is_used_without_isbn13() {
        let record = BookRecord {
            issn: Some("03785955".to_string()),
            ..BookRecord::default()
        };
        assert!(record.matches_key(&CatalogKey::Issn("03785955".to_string())));
    }

    #[test]
    fn keyless_record_has_no_key() {
        let record = BookRecord {
            isbn10: Some("0306406152".to_string()),
            ..BookRecord::default()
        };
        assert_eq!(record.key(), None);
    }
}
