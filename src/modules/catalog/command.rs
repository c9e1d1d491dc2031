//! Command vocabulary of the bot.
//!
//! Every chat command is a [`Command`] variant tagged [`CommandKind::Edit`] or
//! [`CommandKind::Read`]. Field setters are enumerated by [`Field`], so the
//! token table can be checked for collisions once, when [`CommandTable`] is
//! built.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use shelf_authz::{RequesterId, Role};
use shelf_db::BookRecord;
use thiserror::Error;

use super::ports::ChatId;

/// Whether a command mutates the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Edit,
    Read,
}

/// Record fields that editors can set one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Authors,
    Publisher,
    PublishedDate,
    PageCount,
    TextSnippet,
    Description,
    Language,
    Location,
    Price,
    Thumbnail,
    Favorite,
    Categories,
}

/// A setter argument that does not fit its field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {} ({reason})", .field.label())]
pub struct FieldValueError {
    pub field: Field,
    pub value: String,
    pub reason: &'static str,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Title,
        Field::Authors,
        Field::Publisher,
        Field::PublishedDate,
        Field::PageCount,
        Field::TextSnippet,
        Field::Description,
        Field::Language,
        Field::Location,
        Field::Price,
        Field::Thumbnail,
        Field::Favorite,
        Field::Categories,
    ];

    /// Command token (without the leading slash) of the setter.
    pub fn token(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Authors => "authors",
            Field::Publisher => "publisher",
            Field::PublishedDate => "date",
            Field::PageCount => "pages",
            Field::TextSnippet => "snippet",
            Field::Description => "description",
            Field::Language => "language",
            Field::Location => "location",
            Field::Price => "price",
            Field::Thumbnail => "thumbnail",
            Field::Favorite => "favorite",
            Field::Categories => "categories",
        }
    }

    /// Human-readable field name used in replies.
    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Authors => "authors",
            Field::Publisher => "publisher",
            Field::PublishedDate => "publication date",
            Field::PageCount => "page count",
            Field::TextSnippet => "text snippet",
            Field::Description => "description",
            Field::Language => "language",
            Field::Location => "location",
            Field::Price => "price",
            Field::Thumbnail => "thumbnail URL",
            Field::Favorite => "favorite flag",
            Field::Categories => "categories",
        }
    }

    /// Parse `raw` and write it into `record`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldValueError`] when `raw` is empty or does not parse for
    /// this field; `record` is left untouched.
    pub fn apply(self, record: &mut BookRecord, raw: &str) -> Result<(), FieldValueError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(self.reject(value, "empty value"));
        }

        match self {
            Field::Title => record.title = value.to_string(),
            Field::Authors => record.authors = value.to_string(),
            Field::Publisher => record.publisher = value.to_string(),
            Field::PublishedDate => record.published_date = value.to_string(),
            Field::TextSnippet => record.text_snippet = value.to_string(),
            Field::Description => record.description = value.to_string(),
            Field::Language => record.language = value.to_string(),
            Field::Location => record.location = value.to_string(),
            Field::Categories => record.categories = value.to_string(),
            Field::PageCount => {
                let pages = value
                    .parse::<u32>()
                    .map_err(|_| self.reject(value, "expected a whole number"))?;
                if pages == 0 {
                    return Err(self.reject(value, "must be positive"));
                }
                record.page_count = Some(pages);
            }
            Field::Price => {
                let price = Decimal::from_str(&value.replace(',', "."))
                    .map_err(|_| self.reject(value, "expected a decimal amount"))?;
                if price.is_sign_negative() {
                    return Err(self.reject(value, "must not be negative"));
                }
                record.price = Some(price.normalize());
            }
            Field::Thumbnail => {
                let url = url::Url::parse(value)
                    .map_err(|_| self.reject(value, "expected an absolute URL"))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(self.reject(value, "expected an http(s) URL"));
                }
                record.thumbnail = Some(url.to_string());
            }
            Field::Favorite => {
                record.is_favorite = parse_flag(value)
                    .ok_or_else(|| self.reject(value, "expected yes or no"))?;
            }
        }
        Ok(())
    }

    fn reject(self, value: &str, reason: &'static str) -> FieldValueError {
        FieldValueError {
            field: self,
            value: value.to_string(),
            reason,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "yes" | "y" | "true" | "on" => Some(true),
        "0" | "no" | "n" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Commands that mutate the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditCommand {
    Add,
    AddManual,
    Delete,
    Set(Field),
}

/// Commands that only consult the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadCommand {
    Start,
    Help,
    Show,
    List,
    Search,
    ByAuthor,
    ByPublisher,
    ByLocation,
    ByCategory,
    Favorites,
    Count,
    Value,
    PagesTotal,
}

/// Every command the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Edit(EditCommand),
    Read(ReadCommand),
}

impl Command {
    /// All commands, setters included.
    pub fn all() -> Vec<Command> {
        let mut commands = vec![
            Command::Edit(EditCommand::Add),
            Command::Edit(EditCommand::AddManual),
            Command::Edit(EditCommand::Delete),
        ];
        commands.extend(
            Field::ALL
                .into_iter()
                .map(|field| Command::Edit(EditCommand::Set(field))),
        );
        commands.extend(
            [
                ReadCommand::Start,
                ReadCommand::Help,
                ReadCommand::Show,
                ReadCommand::List,
                ReadCommand::Search,
                ReadCommand::ByAuthor,
                ReadCommand::ByPublisher,
                ReadCommand::ByLocation,
                ReadCommand::ByCategory,
                ReadCommand::Favorites,
                ReadCommand::Count,
                ReadCommand::Value,
                ReadCommand::PagesTotal,
            ]
            .into_iter()
            .map(Command::Read),
        );
        commands
    }

    /// Token without the leading slash.
    pub fn token(self) -> &'static str {
        match self {
            Command::Edit(EditCommand::Add) => "add",
            Command::Edit(EditCommand::AddManual) => "addmanual",
            Command::Edit(EditCommand::Delete) => "delete",
            Command::Edit(EditCommand::Set(field)) => field.token(),
            Command::Read(ReadCommand::Start) => "start",
            Command::Read(ReadCommand::Help) => "help",
            Command::Read(ReadCommand::Show) => "show",
            Command::Read(ReadCommand::List) => "list",
            Command::Read(ReadCommand::Search) => "search",
            Command::Read(ReadCommand::ByAuthor) => "by_author",
            Command::Read(ReadCommand::ByPublisher) => "by_publisher",
            Command::Read(ReadCommand::ByLocation) => "by_location",
            Command::Read(ReadCommand::ByCategory) => "by_category",
            Command::Read(ReadCommand::Favorites) => "favorites",
            Command::Read(ReadCommand::Count) => "count",
            Command::Read(ReadCommand::Value) => "value",
            Command::Read(ReadCommand::PagesTotal) => "pages_total",
        }
    }

    pub fn kind(self) -> CommandKind {
        match self {
            Command::Edit(_) => CommandKind::Edit,
            Command::Read(_) => CommandKind::Read,
        }
    }

    /// Argument synopsis shown in usage replies.
    pub fn usage(self) -> &'static str {
        match self {
            Command::Edit(EditCommand::Add) => "<isbn|issn> [title hint]",
            Command::Edit(EditCommand::AddManual) => "<isbn|issn> <title>",
            Command::Edit(EditCommand::Delete) | Command::Read(ReadCommand::Show) => {
                "<isbn|issn>"
            }
            Command::Edit(EditCommand::Set(Field::PageCount)) => "<isbn|issn> <number>",
            Command::Edit(EditCommand::Set(Field::Price)) => "<isbn|issn> <amount>",
            Command::Edit(EditCommand::Set(Field::Thumbnail)) => "<isbn|issn> <url>",
            Command::Edit(EditCommand::Set(Field::Favorite)) => "<isbn|issn> <yes|no>",
            Command::Edit(EditCommand::Set(_)) => "<isbn|issn> <text>",
            Command::Read(ReadCommand::Search) => "<title>",
            Command::Read(ReadCommand::ByAuthor) => "<author>",
            Command::Read(ReadCommand::ByPublisher) => "<publisher>",
            Command::Read(ReadCommand::ByLocation) => "<location>",
            Command::Read(ReadCommand::ByCategory) => "<category>",
            Command::Read(
                ReadCommand::Start
                | ReadCommand::Help
                | ReadCommand::List
                | ReadCommand::Favorites
                | ReadCommand::Count
                | ReadCommand::Value
                | ReadCommand::PagesTotal,
            ) => "",
        }
    }
}

/// Two commands claim the same token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command token '/{token}' is claimed by both {first:?} and {second:?}")]
pub struct CommandTableError {
    pub token: &'static str,
    pub first: Command,
    pub second: Command,
}

/// Token lookup table, validated at startup.
#[derive(Debug, Clone)]
pub struct CommandTable {
    by_token: HashMap<&'static str, Command>,
}

/// An inbound line after tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A known command and its trimmed argument text.
    Known { command: Command, args: String },
    /// A `/token` that names no command, with any text after it.
    UnknownCommand { token: String, args: String },
    /// Text without a command token.
    FreeText(String),
    Empty,
}

impl CommandTable {
    /// Build the table from [`Command::all`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandTableError`] when two commands share a token.
    pub fn build() -> Result<Self, CommandTableError> {
        Self::from_commands(Command::all())
    }

    /// Build a table from an explicit command list.
    ///
    /// # Errors
    ///
    /// Returns [`CommandTableError`] when two commands share a token.
    pub fn from_commands(
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<Self, CommandTableError> {
        let mut by_token = HashMap::new();
        for command in commands {
            if let Some(first) = by_token.insert(command.token(), command) {
                return Err(CommandTableError {
                    token: command.token(),
                    first,
                    second: command,
                });
            }
        }
        Ok(Self { by_token })
    }

    /// Look up a bare token (no slash, lowercase).
    pub fn get(&self, token: &str) -> Option<Command> {
        self.by_token.get(token).copied()
    }

    /// Split an inbound message into a command and its arguments.
    ///
    /// `/cmd@botname` addresses a command to a specific bot in group chats;
    /// the suffix is ignored.
    pub fn parse(&self, text: &str) -> ParsedLine {
        let text = text.trim();
        if text.is_empty() {
            return ParsedLine::Empty;
        }
        let Some(rest) = text.strip_prefix('/') else {
            return ParsedLine::FreeText(text.to_string());
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let token = head
            .split_once('@')
            .map_or(head, |(token, _bot)| token)
            .to_lowercase();

        match self.get(&token) {
            Some(command) => ParsedLine::Known {
                command,
                args: args.to_string(),
            },
            None => ParsedLine::UnknownCommand {
                token,
                args: args.to_string(),
            },
        }
    }

    /// Commands of one kind, sorted by token, for the help reply.
    pub fn commands_of(&self, kind: CommandKind) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .by_token
            .values()
            .copied()
            .filter(|command| command.kind() == kind)
            .collect();
        commands.sort_by_key(|command| command.token());
        commands
    }
}

/// One authorized inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub requester: RequesterId,
    pub chat: ChatId,
    pub role: Role,
    pub command: Command,
    pub args: String,
}

impl CommandInvocation {
    /// First whitespace-separated argument and the remaining text.
    pub fn split_args(&self) -> (Option<&str>, &str) {
        let args = self.args.trim();
        if args.is_empty() {
            return (None, "");
        }
        match args.split_once(char::is_whitespace) {
            Some((first, rest)) => (Some(first), rest.trim()),
            None => (Some(args), ""),
        }
    }
}
