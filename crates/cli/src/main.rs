use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::modules::catalog::identifier::IdentifierKey;
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Chat-driven library catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the webhook until interrupted
    Serve,
    /// Show how an ISBN-10, ISBN-13 or ISSN resolves
    Resolve {
        /// Identifier as typed in chat, separators allowed
        identifier: String,
    },
    /// Load settings and wire the modules without serving
    CheckConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { identifier } => Ok(resolve(&identifier)),
        Commands::CheckConfig => {
            let settings = load_settings()?;
            let registry = shelf_app::build_registry(&settings)?;
            let names: Vec<&str> = registry.modules().iter().map(|m| m.name()).collect();
            println!("environment: {:?}", settings.environment);
            println!("listen: {}:{}", settings.server.host, settings.server.port);
            println!(
                "roles: {} editors, {} readers",
                settings.roles.editors.len(),
                settings.roles.readers.len()
            );
            println!("modules: {}", names.join(", "));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve => {
            let settings = load_settings()?;
            shelf_telemetry::init(&settings.telemetry)?;
            tokio::runtime::Runtime::new()
                .context("failed to start the async runtime")?
                .block_on(shelf_app::run(settings))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().with_context(|| "failed to load shelf settings")
}

fn resolve(raw: &str) -> ExitCode {
    let key = IdentifierKey::resolve(raw);
    let Some(canonical) = key.canonical() else {
        eprintln!("'{}' is not a valid ISBN-10, ISBN-13 or ISSN", raw.trim());
        return ExitCode::FAILURE;
    };

    println!("kind: {}", key.kind());
    println!("canonical: {canonical}");
    if let Some(isbn10) = key.isbn10() {
        println!("isbn10: {isbn10}");
    }
    ExitCode::SUCCESS
}

