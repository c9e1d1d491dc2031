//! Shelf application library
//!
//! Chat-driven library catalog: the catalog module, its adapters and the
//! bootstrap shared by the binaries.

pub mod modules;

use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Build a registry holding every application module.
pub fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings)?;
    Ok(registry)
}

/// Initialize, start and serve all modules until shutdown, then stop them.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        host = %settings.server.host,
        port = settings.server.port,
        "shelf bootstrap starting"
    );

    let registry = build_registry(&settings)?;
    let ctx = InitCtx::new(&settings);
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;
    tracing::info!(modules = registry.modules().len(), "shelf bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    served
}
