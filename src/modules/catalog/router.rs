//! Role-gated command dispatch.
//!
//! An invocation first goes through the edit path. Only when that path
//! returns [`Dispatch::Unhandled`] (requester is not an editor, or the command
//! is not an edit command) does it reach the read path, so a single message
//! never produces both an edit reply and a read reply.

use std::sync::Arc;

use shelf_authz::{RequesterId, Role, RoleDirectory};
use shelf_db::BookQuery;

use super::command::{
    Command, CommandInvocation, CommandTable, EditCommand, ParsedLine, ReadCommand,
};
use super::error::CatalogError;
use super::handlers::{CatalogService, Reply, Total};
use super::messages;
use super::ports::{ChatId, Messenger};

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub requester: RequesterId,
    pub chat: ChatId,
    pub text: String,
}

/// Outcome of offering an invocation to one dispatch path.
#[derive(Debug)]
pub enum Dispatch {
    /// The path ran a handler; no other path may run.
    Handled(Result<Reply, CatalogError>),
    /// The path declined; the invocation is handed back untouched.
    Unhandled(CommandInvocation),
}

/// Authorizes, parses and dispatches inbound messages, then sends the reply.
#[derive(Clone)]
pub struct CommandRouter {
    roles: Arc<RoleDirectory>,
    table: Arc<CommandTable>,
    service: CatalogService,
    messenger: Arc<dyn Messenger>,
}

impl CommandRouter {
    pub fn new(
        roles: Arc<RoleDirectory>,
        table: Arc<CommandTable>,
        service: CatalogService,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            roles,
            table,
            service,
            messenger,
        }
    }

    /// Handle one message end to end. Text replies and errors are sent here;
    /// row sets have already been sent by the batcher when this returns.
    pub async fn handle(&self, message: InboundMessage) -> Result<Reply, CatalogError> {
        let outcome = self.route(&message).await;

        let text = match &outcome {
            Ok(Reply::Text(text)) => Some(text.clone()),
            Ok(Reply::Delivered(_)) => None,
            Err(error) => {
                if error.is_system_failure() {
                    tracing::error!(requester = message.requester, %error, "command failed");
                } else {
                    tracing::info!(requester = message.requester, %error, "command rejected");
                }
                Some(error.reply())
            }
        };
        if let Some(text) = text {
            if let Err(error) = self.messenger.send(message.chat, &text).await {
                tracing::warn!(chat = message.chat, %error, "reply dropped");
            }
        }

        outcome
    }

    async fn route(&self, message: &InboundMessage) -> Result<Reply, CatalogError> {
        let Some(role) = self.roles.role_of(message.requester) else {
            tracing::warn!(requester = message.requester, "message from unknown requester");
            return Err(CatalogError::Unauthorized);
        };

        let invocation = match self.table.parse(&message.text) {
            ParsedLine::Known { command, args } => CommandInvocation {
                requester: message.requester,
                chat: message.chat,
                role,
                command,
                args,
            },
            ParsedLine::FreeText(text) => {
                return self
                    .service
                    .list(message.chat, BookQuery::TitleContains(text))
                    .await;
            }
            ParsedLine::UnknownCommand { token, args } if !args.is_empty() => {
                tracing::debug!(%token, "unknown command, searching its text");
                return self
                    .service
                    .list(message.chat, BookQuery::TitleContains(args))
                    .await;
            }
            ParsedLine::UnknownCommand { token, .. } => {
                tracing::debug!(%token, "unknown command");
                return Ok(Reply::Text(messages::INCORRECT_USAGE.to_string()));
            }
            ParsedLine::Empty => {
                return Ok(Reply::Text(messages::INCORRECT_USAGE.to_string()));
            }
        };

        tracing::debug!(
            requester = invocation.requester,
            %role,
            command = invocation.command.token(),
            "dispatching command"
        );

        match self.dispatch_edit(invocation).await {
            Dispatch::Handled(outcome) => outcome,
            Dispatch::Unhandled(invocation) => self.dispatch_read(invocation).await,
        }
    }

    /// Edit path: runs edit commands issued by editors, declines the rest.
    pub async fn dispatch_edit(&self, invocation: CommandInvocation) -> Dispatch {
        match (invocation.role, invocation.command) {
            (Role::Editor, Command::Edit(command)) => {
                Dispatch::Handled(self.run_edit(command, &invocation).await)
            }
            _ => Dispatch::Unhandled(invocation),
        }
    }

    async fn run_edit(
        &self,
        command: EditCommand,
        invocation: &CommandInvocation,
    ) -> Result<Reply, CatalogError> {
        let (identifier, rest) = invocation.split_args();
        let identifier =
            identifier.ok_or(CatalogError::MissingArgument(invocation.command))?;

        match command {
            EditCommand::Add => self.service.add(identifier, rest).await,
            EditCommand::AddManual => self.service.add_manual(identifier, rest).await,
            EditCommand::Delete => self.service.delete(identifier).await,
            EditCommand::Set(field) => self.service.set_field(field, identifier, rest).await,
        }
    }

    /// Read path: runs read commands for any role. An edit command reaching
    /// this path comes from a reader and gets the read-only notice.
    pub async fn dispatch_read(&self, invocation: CommandInvocation) -> Result<Reply, CatalogError> {
        match invocation.command {
            Command::Read(command) => self.run_read(command, &invocation).await,
            Command::Edit(_) => Ok(Reply::Text(messages::read_only(invocation.command))),
        }
    }

    async fn run_read(
        &self,
        command: ReadCommand,
        invocation: &CommandInvocation,
    ) -> Result<Reply, CatalogError> {
        let chat = invocation.chat;
        let text = invocation.args.trim();
        let required = || {
            if text.is_empty() {
                Err(CatalogError::MissingArgument(invocation.command))
            } else {
                Ok(text.to_string())
            }
        };

        match command {
            ReadCommand::Start => Ok(self.service.start(invocation.role)),
            ReadCommand::Help => Ok(self.service.help(invocation.role)),
            ReadCommand::Show => {
                let (identifier, _) = invocation.split_args();
                let identifier =
                    identifier.ok_or(CatalogError::MissingArgument(invocation.command))?;
                self.service.show(chat, identifier).await
            }
            ReadCommand::List => self.service.list(chat, BookQuery::All).await,
            ReadCommand::Favorites => self.service.list(chat, BookQuery::Favorites).await,
            ReadCommand::Search => {
                let query = BookQuery::TitleContains(required()?);
                self.service.list(chat, query).await
            }
            ReadCommand::ByAuthor => {
                let query = BookQuery::AuthorContains(required()?);
                self.service.list(chat, query).await
            }
            ReadCommand::ByPublisher => {
                let query = BookQuery::PublisherContains(required()?);
                self.service.list(chat, query).await
            }
            ReadCommand::ByLocation => {
                let query = BookQuery::LocationContains(required()?);
                self.service.list(chat, query).await
            }
            ReadCommand::ByCategory => {
                let query = BookQuery::CategoryContains(required()?);
                self.service.list(chat, query).await
            }
            ReadCommand::Count => self.service.total(Total::Books).await,
            ReadCommand::Value => self.service.total(Total::Value).await,
            ReadCommand::PagesTotal => self.service.total(Total::Pages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::catalog::batcher::{DeliveryReport, ResultBatcher};
    use crate::modules::catalog::handlers::BatchSizes;
    use crate::modules::catalog::testing::{CountingStore, RecordingMessenger, StaticLookup};
    use rstest::rstest;
    use crate::modules::catalog::telegram::MAX_MESSAGE_CHARS;
    use std::time::Duration;

    const EDITOR: RequesterId = 100;
    const READER: RequesterId = 200;
    const STRANGER: RequesterId = 300;
    const CHAT: ChatId = 42;

    struct Harness {
        store: Arc<CountingStore>,
        messenger: Arc<RecordingMessenger>,
        router: CommandRouter,
    }

    fn harness() -> Harness {
        let store = Arc::new(CountingStore::default());
        let messenger = Arc::new(RecordingMessenger::default());
        let lookup = Arc::new(
            StaticLookup::default().with("9780306406157", "Signals and Systems"),
        );
        let table = Arc::new(CommandTable::build().unwrap());
        let service = CatalogService::new(
            store.clone(),
            lookup,
            ResultBatcher::new(messenger.clone(), Duration::ZERO, MAX_MESSAGE_CHARS),
            table.clone(),
            BatchSizes::default(),
        );
        let router = CommandRouter::new(
            Arc::new(RoleDirectory::new([EDITOR], [READER])),
            table,
            service,
            messenger.clone(),
        );
        Harness {
            store,
            messenger,
            router,
        }
    }

    fn message(requester: RequesterId, text: &str) -> InboundMessage {
        InboundMessage {
            requester,
            chat: CHAT,
            text: text.to_string(),
        }
    }

    #[rstest]
    #[case("/add 0306406152")]
    #[case("/list")]
    #[case("/delete not-an-isbn")]
    #[case("/nonsense")]
    #[case("free text")]
    #[case("")]
    #[tokio::test]
    async fn stranger_gets_one_refusal_and_no_store_access(#[case] text: &str) {
        let h = harness();
        let outcome = h.router.handle(message(STRANGER, text)).await;

        assert!(matches!(outcome, Err(CatalogError::Unauthorized)));
        assert_eq!(h.messenger.texts(), vec![messages::REFUSAL.to_string()]);
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn editor_edit_command_gets_only_the_edit_reply() {
        let h = harness();
        h.router
            .handle(message(EDITOR, "/add 0306406152"))
            .await
            .unwrap();

        let sent = h.messenger.texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Added \"Signals and Systems\""));
        assert_eq!(h.store.reads(), 1);
        assert_eq!(h.store.writes(), 1);
    }

    #[tokio::test]
    async fn edit_path_declines_readers_and_read_commands() {
        let h = harness();
        let invocation = CommandInvocation {
            requester: READER,
            chat: CHAT,
            role: Role::Reader,
            command: Command::Edit(EditCommand::Delete),
            args: "9780306406157".to_string(),
        };
        assert!(matches!(
            h.router.dispatch_edit(invocation.clone()).await,
            Dispatch::Unhandled(returned) if returned == invocation
        ));

        let invocation = CommandInvocation {
            role: Role::Editor,
            command: Command::Read(ReadCommand::List),
            ..invocation
        };
        assert!(matches!(
            h.router.dispatch_edit(invocation).await,
            Dispatch::Unhandled(_)
        ));
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn reader_edit_command_is_refused_as_read_only() {
        let h = harness();
        let outcome = h
            .router
            .handle(message(READER, "/delete 9780306406157"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Reply::Text(messages::read_only(Command::Edit(EditCommand::Delete)))
        );
        assert_eq!(h.store.calls(), 0);
        assert_eq!(h.messenger.texts().len(), 1);
    }

    #[tokio::test]
    async fn editors_can_read() {
        let h = harness();
        h.router
            .handle(message(EDITOR, "/add 0306406152"))
            .await
            .unwrap();
        h.messenger.clear();

        let outcome = h.router.handle(message(EDITOR, "/list")).await.unwrap();
        assert_eq!(
            outcome,
            Reply::Delivered(DeliveryReport { rows: 1, units: 1 })
        );
        assert_eq!(h.messenger.texts().len(), 1);
    }

    #[tokio::test]
    async fn free_text_is_a_title_search() {
        let h = harness();
        h.router
            .handle(message(EDITOR, "/add 0306406152"))
            .await
            .unwrap();
        h.messenger.clear();

        h.router.handle(message(READER, "signals")).await.unwrap();
        let sent = h.messenger.texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Signals and Systems"));
    }

    #[tokio::test]
    async fn unknown_command_with_text_searches_that_text() {
        let h = harness();
        h.router
            .handle(message(EDITOR, "/add 0306406152"))
            .await
            .unwrap();
        h.messenger.clear();

        h.router
            .handle(message(READER, "/find Signals"))
            .await
            .unwrap();
        let sent = h.messenger.texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Signals and Systems"));
    }

    #[rstest]
    #[case("/nonsense")]
    #[case("/nonsense@shelf_bot")]
    #[case("   ")]
    #[tokio::test]
    async fn unknown_or_empty_input_gets_usage_notice(#[case] text: &str) {
        let h = harness();
        h.router.handle(message(READER, text)).await.unwrap();
        assert_eq!(
            h.messenger.texts(),
            vec![messages::INCORRECT_USAGE.to_string()]
        );
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn missing_identifier_gets_usage_for_the_command() {
        let h = harness();
        let outcome = h.router.handle(message(EDITOR, "/price")).await;
        assert!(matches!(outcome, Err(CatalogError::MissingArgument(_))));
        assert_eq!(
            h.messenger.texts(),
            vec!["Usage: /price <isbn|issn> <amount>".to_string()]
        );
    }

    #[tokio::test]
    async fn invalid_identifier_is_rejected_before_the_store() {
        let h = harness();
        h.router
            .handle(message(EDITOR, "/show 1234567890"))
            .await
            .unwrap_err();
        assert_eq!(
            h.messenger.texts(),
            vec![messages::invalid_identifier("1234567890")]
        );
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn empty_search_result_sends_no_results_notice() {
        let h = harness();
        h.router
            .handle(message(READER, "/by_author Nobody"))
            .await
            .unwrap();
        assert_eq!(h.messenger.texts(), vec![messages::NO_RESULTS.to_string()]);
    }
}
