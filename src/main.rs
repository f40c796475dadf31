use std::sync::Arc;

use anyhow::Context;
use lead_dialer::config::Config;
use lead_dialer::core::poller::Poller;
use lead_dialer::core::processor::LeadProcessor;
use lead_dialer::integrations::omnidim::OmniDimClient;
use lead_dialer::lead_source;
use lead_dialer::retry::RetryPolicy;
use lead_dialer::shutdown;
use lead_dialer::state_store::{ProcessedSet, StateStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the dialer.
///
/// Initializes logging, configuration, the lead source, the OmniDim client and
/// the processed-id state, then polls until Ctrl-C or SIGTERM.
/// Any initialization failure aborts with the full error chain.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_dialer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let source = lead_source::connect(&config)
        .await
        .context("Failed to initialize lead source")?;
    tracing::info!("✓ Lead source ready: {}", source.describe());

    let dispatcher =
        OmniDimClient::from_config(&config).context("Failed to initialize OmniDim client")?;
    tracing::info!("✓ OmniDim client initialized: {}", config.omnidim_base_url);

    let processed = ProcessedSet::load(StateStore::new(&config.state_file)).await;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(shutdown::listen_for_signals(trigger));

    let processor = LeadProcessor::new(
        Arc::new(dispatcher),
        processed,
        RetryPolicy::from_config(&config),
        shutdown.clone(),
    );

    Poller::from_config(&config, source, processor, shutdown)
        .run()
        .await;

    Ok(())
}
