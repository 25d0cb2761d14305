//! Subcommand implementations and the wiring they share.

pub mod onboard;
pub mod oracle;
pub mod random;
pub mod show;
pub mod topics;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use apeiron_config::AppConfig;
use apeiron_core::provider::Provider;
use apeiron_oracle::StaticCatalog;
use tracing::debug;

pub type CommandResult = Result<(), Box<dyn Error>>;

fn load_config() -> Result<AppConfig, Box<dyn Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// The catalog named in config, or the built-in one.
fn load_catalog(config: &AppConfig) -> Result<Arc<StaticCatalog>, Box<dyn Error>> {
    let catalog = match &config.catalog.path {
        Some(path) => {
            debug!(path = %path, "Loading catalog from file");
            StaticCatalog::load_from(Path::new(path))?
        }
        None => StaticCatalog::embedded()?,
    };
    Ok(Arc::new(catalog))
}

fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn Error>> {
    let router = apeiron_providers::router::build_from_config(config);
    router
        .default()
        .ok_or_else(|| "No default provider configured".into())
}

/// Fail early with setup instructions when no key is configured.
fn require_api_key(config: &AppConfig) -> CommandResult {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    APEIRON_API_KEY   (generic)");
    eprintln!("    GEMINI_API_KEY    (for Gemini, the default provider)");
    eprintln!("    OPENAI_API_KEY    (for OpenAI-compatible providers)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
