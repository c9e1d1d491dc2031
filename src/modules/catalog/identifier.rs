//! Book identifier validation and canonicalization.
//!
//! The validators are strict shape-and-checksum predicates: anything that is
//! not exactly the expected length and alphabet is rejected. [`IdentifierKey`]
//! resolves a user-supplied token into the canonical key used for storage.

use std::fmt;

use shelf_db::CatalogKey;

/// Prefix prepended when converting an ISBN-10 into its EAN-13 form.
const ISBN13_BOOKLAND_PREFIX: &str = "978";

fn digit(byte: u8) -> Option<u32> {
    byte.is_ascii_digit().then(|| u32::from(byte - b'0'))
}

fn digits(bytes: &[u8]) -> Option<Vec<u32>> {
    bytes.iter().map(|&byte| digit(byte)).collect()
}

/// EAN-13 check digit over the first twelve digits.
fn ean13_check_digit(first_twelve: &[u32]) -> u32 {
    let sum: u32 = first_twelve
        .iter()
        .enumerate()
        .map(|(index, value)| if index % 2 == 0 { *value } else { value * 3 })
        .sum();
    (10 - sum % 10) % 10
}

/// True iff `s` is nine digits followed by a digit or `X` and the weighted
/// sum `Σ (i+1)·d[i] + 10·check` is divisible by 11.
pub fn validate_isbn10(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let Some(body) = digits(&bytes[..9]) else {
        return false;
    };
    let check = match bytes[9] {
        b'X' => 10,
        other => match digit(other) {
            Some(value) => value,
            None => return false,
        },
    };

    let sum: u32 = body
        .iter()
        .zip(1..)
        .map(|(value, weight)| value * weight)
        .sum::<u32>()
        + 10 * check;
    sum % 11 == 0
}

/// True iff `s` is exactly thirteen digits with a valid EAN-13 check digit.
pub fn validate_isbn13(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 13 {
        return false;
    }
    match digits(bytes) {
        Some(values) => ean13_check_digit(&values[..12]) == values[12],
        None => false,
    }
}

/// True iff `s` is seven digits followed by a check character, where the
/// check value is `(11 - Σ d[k]·(8-k) mod 11) mod 11` and a value of 10 is
/// written `X`.
pub fn validate_issn(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 8 {
        return false;
    }
    let Some(body) = digits(&bytes[..7]) else {
        return false;
    };
    let sum: u32 = body
        .iter()
        .zip((2..=8).rev())
        .map(|(value, weight)| value * weight)
        .sum();
    let expected = (11 - sum % 11) % 11;

    match bytes[7] {
        b'X' => expected == 10,
        other => digit(other) == Some(expected),
    }
}

/// Convert a valid ISBN-10 into its ISBN-13 form, `None` when `isbn10` does
/// not validate.
pub fn convert_isbn10_to_isbn13(isbn10: &str) -> Option<String> {
    if !validate_isbn10(isbn10) {
        return None;
    }
    let stem = format!("{ISBN13_BOOKLAND_PREFIX}{}", &isbn10[..9]);
    let values = digits(stem.as_bytes())?;
    Some(format!("{stem}{}", ean13_check_digit(&values)))
}

/// A user-supplied identifier after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierKey {
    /// Valid ISBN-10 together with its computed ISBN-13.
    Isbn10 { isbn10: String, isbn13: String },
    Isbn13(String),
    Issn(String),
    /// Token that matched no format, kept for the rejection reply.
    Invalid(String),
}

impl IdentifierKey {
    /// Resolve a raw token. Surrounding whitespace and `-`/space separators
    /// are ignored and a trailing `x` is read as `X`.
    ///
    /// Formats have distinct lengths (10, 13, 8), so at most one predicate can
    /// accept a token; they are still tried in ISBN-10, ISBN-13, ISSN order.
    pub fn resolve(raw: &str) -> Self {
        let token = normalize(raw);

        if validate_isbn10(&token) {
            if let Some(isbn13) = convert_isbn10_to_isbn13(&token) {
                return IdentifierKey::Isbn10 {
                    isbn10: token,
                    isbn13,
                };
            }
        }
        if validate_isbn13(&token) {
            return IdentifierKey::Isbn13(token);
        }
        if validate_issn(&token) {
            return IdentifierKey::Issn(token);
        }
        IdentifierKey::Invalid(raw.trim().to_string())
    }

    /// Storage key, `None` for an invalid token.
    pub fn catalog_key(&self) -> Option<CatalogKey> {
        match self {
            IdentifierKey::Isbn10 { isbn13, .. } | IdentifierKey::Isbn13(isbn13) => {
                Some(CatalogKey::Isbn13(isbn13.clone()))
            }
            IdentifierKey::Issn(issn) => Some(CatalogKey::Issn(issn.clone())),
            IdentifierKey::Invalid(_) => None,
        }
    }

    /// Canonical value: the ISBN-13 for books, the ISSN for serials.
    pub fn canonical(&self) -> Option<&str> {
        match self {
            IdentifierKey::Isbn10 { isbn13, .. } | IdentifierKey::Isbn13(isbn13) => Some(isbn13),
            IdentifierKey::Issn(issn) => Some(issn),
            IdentifierKey::Invalid(_) => None,
        }
    }

    pub fn isbn10(&self) -> Option<&str> {
        match self {
            IdentifierKey::Isbn10 { isbn10, .. } => Some(isbn10),
            _ => None,
        }
    }

    pub fn isbn13(&self) -> Option<&str> {
        match self {
            IdentifierKey::Isbn10 { isbn13, .. } | IdentifierKey::Isbn13(isbn13) => Some(isbn13),
            _ => None,
        }
    }

    pub fn issn(&self) -> Option<&str> {
        match self {
            IdentifierKey::Issn(issn) => Some(issn),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IdentifierKey::Isbn10 { .. } => "ISBN-10",
            IdentifierKey::Isbn13(_) => "ISBN-13",
            IdentifierKey::Issn(_) => "ISSN",
            IdentifierKey::Invalid(_) => "invalid",
        }
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKey::Isbn10 { isbn10, isbn13 } => write!(f, "{isbn10} ({isbn13})"),
            IdentifierKey::Isbn13(value) | IdentifierKey::Issn(value) => f.write_str(value),
            IdentifierKey::Invalid(raw) => f.write_str(raw),
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| if c == 'x' { 'X' } else { c })
        .collect()
}
