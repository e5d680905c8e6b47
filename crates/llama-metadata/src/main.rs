//! `build-metadata`: rebuild `protocols.json` and `chains.json` from the
//! upstream APIs. Takes no arguments; see `config.rs` for overrides.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use llama_metadata::config::AppConfig;
use llama_metadata::pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("build_metadata=info,llama_metadata=info,llama_core=warn")
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Failed to load config: {}", e)
    })?;

    tracing::info!(
        server_url = %config.api.server_url,
        output_dir = %config.output.dir,
        cache_dir = ?config.fetch.cache_dir,
        "Configuration loaded"
    );

    let snapshot = pipeline::run(&config).await?;

    tracing::info!(
        protocols = snapshot.protocols.len(),
        chains = snapshot.chains.len(),
        "finished building metadata"
    );
    Ok(())
}
