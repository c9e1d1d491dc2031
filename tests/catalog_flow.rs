//! End-to-end flows through the HTTP stack: webhook in, chat replies out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, extract::Request, http::StatusCode, Router};
use shelf_app::modules::catalog::{
    identifier::IdentifierKey,
    messages,
    ports::{BookMetadata, ChatId, LookupError, Messenger, MessengerError, MetadataLookup},
    telegram::SECRET_HEADER,
    CatalogModule,
};
use shelf_db::{BookQuery, CatalogKey, CatalogStore, InMemoryCatalogStore};
use shelf_kernel::{settings::Settings, ModuleRegistry};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";
const EDITOR: i64 = 11;
const READER: i64 = 22;
const STRANGER: i64 = 33;

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(ChatId, String)>>,
}

impl Outbox {
    fn drain(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .drain(..)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Messenger for Outbox {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), MessengerError> {
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }
}

struct Shelf {
    books: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl MetadataLookup for Shelf {
    async fn fetch_by_identifier(
        &self,
        id: &IdentifierKey,
        _title_hint: Option<&str>,
    ) -> Result<Option<BookMetadata>, LookupError> {
        Ok(id
            .canonical()
            .and_then(|key| self.books.get(key))
            .map(|title| BookMetadata {
                title: title.to_string(),
                authors: vec!["Jane Writer".to_string()],
                page_count: Some(320),
                ..BookMetadata::default()
            }))
    }
}

struct App {
    router: Router,
    store: Arc<InMemoryCatalogStore>,
    outbox: Arc<Outbox>,
}

fn app() -> App {
    let mut settings = Settings::default();
    settings.telegram.secret_token = SECRET.to_string();
    settings.roles.editors = vec![EDITOR];
    settings.roles.readers = vec![READER];
    settings.delivery.pacing_ms = 0;
    settings.delivery.list_batch_size = 2;

    let store = Arc::new(InMemoryCatalogStore::new());
    let outbox = Arc::new(Outbox::default());
    let lookup = Arc::new(Shelf {
        books: HashMap::from([
            ("9780306406157", "Signals and Systems"),
            ("9780804429573", "Brave New World"),
        ]),
    });

    let module =
        CatalogModule::assemble(&settings, store.clone(), lookup, outbox.clone()).unwrap();
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(module)).unwrap();

    App {
        router: shelf_http::build_router(&registry, &settings),
        store,
        outbox,
    }
}

impl App {
    async fn say(&self, requester: i64, text: &str) -> Vec<String> {
        let body = serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": {"id": requester},
                "chat": {"id": requester},
                "text": text,
            }
        });
        let request = Request::builder()
            .method("POST")
            .uri("/api/catalog/webhook")
            .header("content-type", "application/json")
            .header(SECRET_HEADER, SECRET)
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        self.outbox.drain()
    }
}

#[tokio::test]
async fn add_readd_and_delete_by_either_isbn_form() {
    let app = app();

    let replies = app.say(EDITOR, "/add 0-306-40615-2").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Added \"Signals and Systems\""));

    let replies = app.say(EDITOR, "/add 9780306406157").await;
    assert_eq!(
        replies,
        vec![messages::already_present(&CatalogKey::Isbn13(
            "9780306406157".to_string()
        ))]
    );

    let replies = app.say(EDITOR, "/delete 9780306406157").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Deleted"));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn readers_browse_but_cannot_edit() {
    let app = app();
    app.say(EDITOR, "/add 0306406152").await;
    app.say(EDITOR, "/add 080442957x").await;
    app.say(EDITOR, "/location 080442957X Hall, shelf 2").await;

    let replies = app.say(READER, "/delete 0306406152").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("read-only"));
    assert_eq!(app.store.len(), 2);

    let replies = app.say(READER, "/by_location hall").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("Brave New World"));
    assert!(replies[0].ends_with("Total: 1"));

    let replies = app.say(READER, "/pages_total").await;
    assert_eq!(replies, vec![messages::pages_total(640.into())]);
}

#[tokio::test]
async fn listing_is_paginated() {
    let app = app();
    app.say(EDITOR, "/add 0306406152").await;
    app.say(EDITOR, "/add 080442957X").await;
    app.say(EDITOR, "/addmanual 0378-5955 Journal of Cataloguing").await;

    let replies = app.say(READER, "/list").await;
    assert_eq!(replies.len(), 2);
    assert!(replies[0].starts_with("Brave New World"));
    assert!(replies[1].ends_with("Total: 3"));
}

#[tokio::test]
async fn strangers_are_refused_and_nothing_changes() {
    let app = app();
    let replies = app.say(STRANGER, "/add 0306406152").await;
    assert_eq!(replies, vec![messages::REFUSAL.to_string()]);
    assert!(app
        .store
        .query(&BookQuery::All)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_books_are_reported() {
    let app = app();
    let replies = app.say(EDITOR, "/add 9781234567897").await;
    assert_eq!(replies, vec![messages::lookup_failed("9781234567897")]);
    assert!(app.store.is_empty());
}
