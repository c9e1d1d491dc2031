//! Telegram Bot API transport: the webhook endpoint and the `sendMessage`
//! messenger.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shelf_http::error::AppError;
use shelf_kernel::settings::TelegramSettings;

use super::ports::{ChatId, Messenger, MessengerError};
use super::router::{CommandRouter, InboundMessage};

/// Header carrying the secret registered with `setWebhook`.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Longest text Telegram accepts in one message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// The text message carried by this update, if any. Edits, joins,
    /// stickers and channel posts without a sender are ignored.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let requester = message.from?.id;
        let text = message.text?;
        Some(InboundMessage {
            requester,
            chat: message.chat.id,
            text,
        })
    }
}

/// Shared state of the webhook route.
#[derive(Clone)]
pub struct WebhookState {
    pub router: CommandRouter,
    pub secret: String,
}

/// `POST /webhook`: authenticate, decode and process one update.
pub async fn webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented != Some(state.secret.as_str()) {
        tracing::warn!("webhook call with a missing or wrong secret token");
        return Err(AppError::forbidden("Authentication Failed."));
    }

    let update: Update = serde_json::from_slice(&body).map_err(|error| {
        tracing::debug!(%error, "undecodable update");
        AppError::bad_request("malformed update")
    })?;
    let update_id = update.update_id;

    match update.into_inbound() {
        Some(message) => {
            tracing::debug!(update_id, requester = message.requester, "update received");
            // The outcome has already been reported to the chat.
            let _ = state.router.handle(message).await;
        }
        None => tracing::debug!(update_id, "update without text ignored"),
    }
    Ok("ok")
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
}

/// Split `text` into pieces Telegram accepts, preferring line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(limit) {
                pieces.push(chunk.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// `sendMessage` client.
#[derive(Debug, Clone)]
pub struct TelegramMessenger {
    http: Client,
    endpoint: String,
    pacing: Duration,
}

impl TelegramMessenger {
    /// `pacing` is the pause between the pieces of a text too long for one
    /// message.
    pub fn new(settings: &TelegramSettings, pacing: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to create Telegram HTTP client")?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            settings.api_base.trim_end_matches('/'),
            settings.bot_token
        );
        Ok(Self {
            http,
            endpoint,
            pacing,
        })
    }

    async fn send_one(&self, chat: ChatId, text: &str) -> Result<(), MessengerError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: chat,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), MessengerError> {
        for (index, piece) in split_message(text, MAX_MESSAGE_CHARS).iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            self.send_one(chat, piece).await?;
        }
        Ok(())
    }
}
