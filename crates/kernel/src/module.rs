//! The unit of composition: each feature of the service is a [`Module`].

use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// What a module can see while it initializes and starts.
#[derive(Debug, Clone, Copy)]
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

impl<'a> InitCtx<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

/// A named feature with HTTP routes and a lifecycle.
///
/// The registry calls `init` on every module, then `start` on every module,
/// then serves the routes; `stop` runs in reverse order on shutdown.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the `/api/{name}` mount point.
    fn name(&self) -> &'static str;

    /// Check settings and prepare; no request is served yet.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the module's mount point.
    fn routes(&self) -> Router {
        Router::new()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. Runs even when another module failed to stop.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
