//! Honey-pot agent console
//!
//! A terminal dashboard that plays a scam-baiting persona. Messages typed by
//! the operator stand in for a scammer; a remote language model classifies
//! the conversation, replies in character once a scam is confirmed, and
//! extracts payment and contact details from what the scammer reveals.

mod config;
mod intelligence;
mod llm;
mod oracle;
mod runtime;
mod state_machine;
mod ui;

use config::HoneypotConfig;
use llm::{GeminiService, LlmService, LoggingService};
use oracle::AnalysisClient;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = HoneypotConfig::from_env()?;

    // The dashboard owns the terminal, so logs go to a file
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "honeypot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let gemini = GeminiService::new(
        config.api_key.clone(),
        &config.model,
        config.gateway.as_deref(),
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(gemini)));
    tracing::info!(
        model = %llm.model_id(),
        gateway = ?config.gateway,
        timeout_secs = config.request_timeout.as_secs(),
        "Analysis client initialized"
    );

    let analyst = AnalysisClient::new(llm)
        .with_timeout(config.request_timeout)
        .with_temperature(config.temperature);

    let handle = runtime::start_session(analyst);
    ui::run_app(handle).await?;

    tracing::info!("Honey-pot console exited");
    Ok(())
}
