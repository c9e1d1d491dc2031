//! Library catalog managed through chat commands.

pub mod batcher;
pub mod command;
pub mod error;
pub mod handlers;
pub mod identifier;
pub mod lookup;
pub mod messages;
pub mod ports;
pub mod router;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::{routing::post, Router};
use shelf_authz::RoleDirectory;
use shelf_db::{CatalogStore, InMemoryCatalogStore};
use shelf_kernel::{settings::Settings, InitCtx, Module};

use self::batcher::ResultBatcher;
use self::command::CommandTable;
use self::handlers::{BatchSizes, CatalogService};
use self::ports::{Messenger, MetadataLookup};
use self::router::CommandRouter;
use self::telegram::{TelegramMessenger, WebhookState, MAX_MESSAGE_CHARS};

/// Catalog module: serves the Telegram webhook under `/api/catalog/webhook`.
pub struct CatalogModule {
    state: WebhookState,
}

impl CatalogModule {
    /// Wire the production adapters from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let lookup: Arc<dyn MetadataLookup> = Arc::new(lookup::from_settings(&settings.lookup)?);
        let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(
            &settings.telegram,
            Duration::from_millis(settings.delivery.pacing_ms),
        )?);
        Self::assemble(settings, store, lookup, messenger)
    }

    /// Wire the module around the given adapters.
    pub fn assemble(
        settings: &Settings,
        store: Arc<dyn CatalogStore>,
        lookup: Arc<dyn MetadataLookup>,
        messenger: Arc<dyn Messenger>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !settings.telegram.secret_token.is_empty(),
            "telegram.secret_token must be set"
        );

        let table = Arc::new(CommandTable::build().context("invalid command table")?);
        let sizes = batch_sizes(settings)?;
        let batcher = ResultBatcher::new(
            messenger.clone(),
            Duration::from_millis(settings.delivery.pacing_ms),
            MAX_MESSAGE_CHARS,
        );
        let service = CatalogService::new(store, lookup, batcher, table.clone(), sizes);
        let roles = Arc::new(RoleDirectory::from_settings(&settings.roles));

        Ok(Self {
            state: WebhookState {
                router: CommandRouter::new(roles, table, service, messenger),
                secret: settings.telegram.secret_token.clone(),
            },
        })
    }
}

fn batch_sizes(settings: &Settings) -> anyhow::Result<BatchSizes> {
    let list = NonZeroUsize::new(settings.delivery.list_batch_size)
        .context("delivery.list_batch_size must be at least 1")?;
    let detail = NonZeroUsize::new(settings.delivery.detail_batch_size)
        .context("delivery.detail_batch_size must be at least 1")?;
    Ok(BatchSizes { list, detail })
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.roles.editors.is_empty() {
            tracing::warn!(module = self.name(), "no editors configured; the catalog is read-only");
        }
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            list_batch_size = ctx.settings.delivery.list_batch_size,
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/webhook", post(telegram::webhook))
            .with_state(self.state.clone())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

/// Create the catalog module from settings.
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(CatalogModule::from_settings(settings)?))
}
