//! Reply texts and record formatting.

use rust_decimal::Decimal;
use shelf_authz::Role;
use shelf_db::{BookRecord, CatalogKey};

use super::command::{Command, CommandKind, CommandTable, Field};

pub const REFUSAL: &str = "Sorry, you are not authorized to use this bot.";
pub const INCORRECT_USAGE: &str = "Incorrect usage. Send /help to see the available commands.";
pub const NO_RESULTS: &str = "No results.";
pub const INTERNAL_FAILURE: &str = "Something went wrong, please try again later.";

pub fn read_only(command: Command) -> String {
    format!(
        "Your access is read-only: /{} is reserved for editors.",
        command.token()
    )
}

pub fn usage(command: Command) -> String {
    let synopsis = command.usage();
    if synopsis.is_empty() {
        format!("Usage: /{}", command.token())
    } else {
        format!("Usage: /{} {}", command.token(), synopsis)
    }
}

pub fn invalid_identifier(raw: &str) -> String {
    format!("'{raw}' is not a valid ISBN-10, ISBN-13 or ISSN.")
}

pub fn not_found(key: &CatalogKey) -> String {
    format!("There is no book with {key} in the catalog.")
}

pub fn already_present(key: &CatalogKey) -> String {
    format!("The book with {key} is already in the catalog.")
}

pub fn lookup_failed(identifier: &str) -> String {
    format!("Book not found: no metadata is available for {identifier}.")
}

pub fn added(record: &BookRecord) -> String {
    format!("Added \"{}\".\n\n{}", record.title, detail(record))
}

pub fn deleted(key: &CatalogKey) -> String {
    format!("Deleted the book with {key}.")
}

pub fn updated(field: Field, key: &CatalogKey) -> String {
    format!("Updated the {} of the book with {key}.", field.label())
}

pub fn welcome(role: Role) -> String {
    format!(
        "Welcome to the library catalog. You are registered as {role}. Send a title to search \
         for it or /help to see the available commands."
    )
}

pub fn help(table: &CommandTable, role: Role) -> String {
    let mut lines = vec!["Read commands:".to_string()];
    lines.extend(command_lines(table, CommandKind::Read));
    if role.can_edit() {
        lines.push(String::new());
        lines.push("Edit commands:".to_string());
        lines.extend(command_lines(table, CommandKind::Edit));
    }
    lines.push(String::new());
    lines.push("Any other text is searched among titles.".to_string());
    lines.join("\n")
}

fn command_lines(table: &CommandTable, kind: CommandKind) -> Vec<String> {
    table
        .commands_of(kind)
        .into_iter()
        .map(|command| usage(command).replacen("Usage: ", "", 1))
        .collect()
}

pub fn count(total: Decimal) -> String {
    let noun = if total == Decimal::ONE { "book" } else { "books" };
    format!("The catalog holds {total} {noun}.")
}

pub fn value(total: Decimal) -> String {
    format!("The catalog is worth {total:.2} in total.")
}

pub fn pages_total(total: Decimal) -> String {
    format!("The catalog holds {total} pages in total.")
}

/// Trailer appended to the last chunk of a listing.
pub fn total_rows(total: usize) -> String {
    format!("Total: {total}")
}

fn identifiers(record: &BookRecord) -> String {
    let mut parts = Vec::new();
    if let Some(isbn13) = &record.isbn13 {
        parts.push(format!("ISBN-13 {isbn13}"));
    }
    if let Some(isbn10) = &record.isbn10 {
        parts.push(format!("ISBN-10 {isbn10}"));
    }
    if let Some(issn) = &record.issn {
        parts.push(format!("ISSN {issn}"));
    }
    parts.join(" / ")
}

/// One line per record, for listings.
pub fn summary(record: &BookRecord) -> String {
    let favorite = if record.is_favorite { "★ " } else { "" };
    let key = record
        .key()
        .map(|key| key.as_str().to_string())
        .unwrap_or_default();
    if record.authors.is_empty() {
        format!("{favorite}{} [{key}]", record.title)
    } else {
        format!("{favorite}{} by {} [{key}]", record.title, record.authors)
    }
}

/// Full record description, for single-record views.
pub fn detail(record: &BookRecord) -> String {
    let mut lines = vec![format!("Title: {}", record.title)];
    lines.push(identifiers(record));

    let text_fields = [
        ("Authors", &record.authors),
        ("Publisher", &record.publisher),
        ("Published", &record.published_date),
        ("Language", &record.language),
        ("Categories", &record.categories),
        ("Location", &record.location),
        ("Snippet", &record.text_snippet),
        ("Description", &record.description),
    ];
    for (label, value) in text_fields {
        if !value.is_empty() {
            lines.push(format!("{label}: {value}"));
        }
    }
    if let Some(pages) = record.page_count {
        lines.push(format!("Pages: {pages}"));
    }
    if let Some(price) = record.price {
        lines.push(format!("Price: {price:.2}"));
    }
    if let Some(thumbnail) = &record.thumbnail {
        lines.push(format!("Cover: {thumbnail}"));
    }
    lines.push(format!(
        "Favorite: {}",
        if record.is_favorite { "yes" } else { "no" }
    ));
    lines.join("\n")
}
