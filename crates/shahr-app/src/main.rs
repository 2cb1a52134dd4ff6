//! Shahr application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the question-answering client
//! 4. Either answer a single `--ask` question and exit, or restore the saved
//!    identity and start the axum REST API server

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use shahr_api::{routes, AppState};
use shahr_chat::seed::fresh_session;
use shahr_chat::{HttpQueryClient, QueryClient, SessionController, SubmitOutcome};
use shahr_core::{FileIdentityStore, ShahrConfig, StaticCredentialVerifier};

use crate::cli::CliArgs;

/// Submit one question on a fresh session and print the reply.
async fn ask_once(
    config: &ShahrConfig,
    client: Arc<dyn QueryClient>,
    question: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = SessionController::spawn(
        fresh_session(config.chat.summary_max_chars),
        client,
        Duration::from_secs(config.query.timeout_secs),
    );

    match handle.submit(question).await? {
        SubmitOutcome::Dispatched => {}
        outcome => {
            tracing::warn!(?outcome, "Question not sent");
            return Err("question must not be empty".into());
        }
    }
    handle.wait_idle().await?;

    let messages = handle.active_messages().await?;
    if let Some(reply) = messages.last() {
        match reply.search() {
            Some(answer) => println!("{}", answer.answer),
            None => println!("{}", reply.body()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first so its log level can seed the filter.
    let config_file = args.resolve_config_path();
    let loaded = ShahrConfig::load(&config_file);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Shahr v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
    }
    config.validate()?;

    // Query client.
    let client: Arc<dyn QueryClient> = Arc::new(HttpQueryClient::from_config(&config.query)?);
    tracing::info!(endpoint = %config.query.endpoint, "Query client ready");

    if let Some(question) = args.ask.clone() {
        return ask_once(&config, client, question).await;
    }

    // Data directory.
    let data_dir = config.data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let identity = Arc::new(FileIdentityStore::in_dir(&data_dir));
    let state = AppState::new(
        config.clone(),
        Arc::new(StaticCredentialVerifier::demo()),
        identity,
        client,
    );

    match state.restore_identity() {
        Ok(Some(saved)) => tracing::info!(user = %saved.user.name, "Resumed previous login"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not restore saved identity"),
    }

    // === API server ===
    routes::start_server(&config, state).await?;

    Ok(())
}
