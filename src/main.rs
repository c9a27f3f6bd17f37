#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use silibot::bot::Bot;
use silibot::channels::{self, ChannelRegistry, CliChannel, PromptBroker};
use silibot::config::Config;
use silibot::diagnostics::{DiagnosticsCapture, DiagnosticsLayer, PreformattedRenderer};
use silibot::history::ConversationBuffer;
use silibot::providers;
use silibot::reboot::{RebootCoordinator, RebootSignal, ResumeRecord, ResumeReporter, StdProcessExit};
use silibot::signal::{self, SignalKey};
use silibot::summary::Summarizer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// `silibot` - chat bot runtime with in-chat restart and history handoff.
#[derive(Parser, Debug)]
#[command(name = "silibot")]
#[command(version)]
#[command(about = "Chat bot that survives its own restarts.", long_about = None)]
struct Cli {
    /// Config file (default: ./silibot.toml, then ~/.silibot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Show pending restart state left in the signal store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init(cli.config.as_deref())?;

    let capture = Arc::new(DiagnosticsCapture::new(config.diagnostics.max_lines));
    tracing_subscriber::registry()
        .with(
            fmt::layer().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            ),
        )
        .with(DiagnosticsLayer::new(
            capture.clone(),
            DiagnosticsLayer::parse_level(&config.diagnostics.capture_level),
        ))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            run(config, capture).await?;
            // The stdin reader sits in a blocking read that would keep the
            // runtime from shutting down.
            std::process::exit(0);
        }
        Commands::Status => status(&config).await,
    }
}

async fn run(config: Config, capture: Arc<DiagnosticsCapture>) -> Result<()> {
    info!(
        config = %config.config_path.display(),
        bot = %config.bot.name,
        "Starting silibot"
    );

    let store = signal::create_store(&config.store, &config.working_dir)?;
    let history = Arc::new(ConversationBuffer::new(config.history.records_per_channel));
    let prompts = Arc::new(PromptBroker::new());

    let mut registry = ChannelRegistry::new();
    registry.register(Arc::new(CliChannel::from_env()));

    // Tell whoever restarted us that we are back before taking new messages.
    let reporter = ResumeReporter::new(
        &config.bot.name,
        store.clone(),
        registry.clone(),
        Arc::new(PreformattedRenderer::default()),
    );
    let outcome = reporter.run().await;
    info!(?outcome, "Resume check finished");

    history.restore_from(store.as_ref()).await;

    let provider = providers::create_provider(&config.provider)?;
    if let Some(provider) = provider.clone() {
        tokio::spawn(async move {
            if let Err(e) = provider.warmup().await {
                warn!(provider = provider.name(), "Provider warmup failed: {e:#}");
            }
        });
    }

    let summarizer = Arc::new(Summarizer::new(
        history.clone(),
        provider,
        config.summary.clone(),
    ));
    let coordinator = Arc::new(RebootCoordinator::new(
        &config,
        store.clone(),
        history.clone(),
        capture.clone(),
        prompts.clone(),
        Arc::new(StdProcessExit),
    ));
    let bot = Arc::new(Bot::new(
        &config,
        registry.clone(),
        prompts,
        history.clone(),
        capture,
        coordinator,
        summarizer,
    ));

    let (tx, rx) = mpsc::channel(64);
    let listeners = channels::spawn_listeners(&registry, &tx);
    drop(tx);
    info!(channels = ?registry.names(), "Listening");

    tokio::select! {
        () = bot.run(rx) => {}
        () = shutdown_signal() => {}
    }

    for listener in listeners {
        listener.abort();
    }

    // Plain shutdowns keep history too, just without a restart signal.
    if let Err(e) = history.flush(store.as_ref()).await {
        warn!("{e}");
    }
    info!("silibot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}

async fn status(config: &Config) -> Result<()> {
    let store = signal::create_store(&config.store, &config.working_dir)?;

    println!("Config:  {}", config.config_path.display());
    println!("Store:   {}", store.name());

    match store.read(SignalKey::Signal).await {
        Some(raw) => match RebootSignal::parse_decimal(&raw) {
            Some(signal) => println!("Signal:  {signal}"),
            None => println!("Signal:  invalid ({raw})"),
        },
        None => println!("Signal:  none"),
    }

    match store.read(SignalKey::LastSession).await {
        Some(raw) => match ResumeRecord::from_json(&raw) {
            Ok(record) => println!(
                "Resume:  {}@{}/{} at {}",
                record.origin_user,
                record.origin_platform,
                record.origin_channel,
                chrono::DateTime::from_timestamp_millis(record.requested_at_ms)
                    .map_or_else(|| record.requested_at_ms.to_string(), |t| t.to_rfc3339()),
            ),
            Err(e) => println!("Resume:  corrupt ({e})"),
        },
        None => println!("Resume:  none"),
    }

    let logs = store.read(SignalKey::CommandLogs).await;
    println!(
        "Logs:    {}",
        logs.map_or_else(|| "none".to_string(), |l| format!("{} lines", l.lines().count()))
    );

    let snapshot = ConversationBuffer::new(config.history.records_per_channel);
    let channels = snapshot.restore(store.read(SignalKey::HistoryRecords).await.as_deref());
    println!("History: {channels} channels");
    Ok(())
}
