//! grants-ai - grant application enrichment service
//!
//! Keeps a cache of approved applications for the configured funding rounds,
//! classifies each one once through the AI service, and serves the joined
//! result over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grants_ai::config::{load_toml_config_logged, CliOverrides, ServiceConfig};
use grants_ai::services::{
    ApplicationAssembler, CallThrottle, Classifier, IndexerClient, OpenAiConfig, OpenAiExtractor,
    RefreshOrchestrator,
};
use grants_ai::AppState;
use grants_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver};
use grants_common::{KvCache, SqliteCache};

/// Command-line arguments for grants-ai
#[derive(Parser, Debug)]
#[command(name = "grants-ai")]
#[command(about = "Grant application enrichment service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "GRANTS_PORT")]
    port: Option<u16>,

    /// Folder holding the cache database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single refresh cycle and exit
    #[arg(long, conflicts_with = "no_refresh")]
    once: bool,

    /// Serve the existing cache without refreshing it
    #[arg(long)]
    no_refresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    let toml_config = match args.config.as_ref().or(defaults.config_file.as_ref()) {
        Some(path) => load_toml_config_logged(path, std::io::stderr)
            .context("Failed to load configuration")?,
        None => Default::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting grants-ai v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::resolve(
        &CliOverrides {
            port: args.port,
            no_refresh: args.no_refresh,
        },
        &toml_config,
    )?;

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.cache_db_path();
    info!("Cache database: {}", db_path.display());
    let cache: Arc<dyn KvCache> = Arc::new(
        SqliteCache::open(&db_path)
            .await
            .context("Failed to open cache database")?,
    );

    let assembler = ApplicationAssembler::new(cache.clone(), config.rounds.clone());

    let refresh = match &config.openai_api_key {
        Some(api_key) => {
            let extractor = OpenAiExtractor::new(
                OpenAiConfig::new(api_key.clone()).with_model(config.openai_model.clone()),
            )?;
            info!(model = %extractor.model(), "Feature extractor ready");

            let classifier = Classifier::new(
                cache.clone(),
                Arc::new(extractor),
                Arc::new(CallThrottle::serial(config.classify_interval)),
            );
            let source = IndexerClient::new(&config.indexer_url)?;
            info!(url = %source.graphql_url(), "Indexer client ready");

            let orchestrator = RefreshOrchestrator::new(
                cache.clone(),
                Arc::new(source),
                Arc::new(classifier),
                config.rounds.clone(),
                config.refresh.clone(),
            );
            orchestrator.restore_last_report().await;
            Some(Arc::new(orchestrator))
        }
        None => {
            info!("Refresh disabled; serving existing cache");
            None
        }
    };

    if args.once {
        if let Some(orchestrator) = &refresh {
            let report = orchestrator.run_cycle().await?;
            info!(
                applications = report.applications_fetched,
                extracted = report.features_extracted,
                failed = report.features_failed,
                "Refresh cycle complete"
            );
        }
        cache.close().await;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let refresh_task = refresh
        .clone()
        .map(|orchestrator| tokio::spawn(orchestrator.run(cancel.clone())));

    let app = grants_ai::build_router(AppState::new(assembler, refresh));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    cancel.cancel();
    if let Some(task) = refresh_task {
        if let Err(e) = task.await {
            error!("Refresh task ended abnormally: {}", e);
        }
    }
    cache.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
