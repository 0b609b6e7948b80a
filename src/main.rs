//! agentqa gateway entry point

use agentqa::agents::{GeneralAgent, InMemoryConversationStore};
use agentqa::auth::{AuthService, PasswordHasher, TokenIssuer};
use agentqa::config::GatewayConfig;
use agentqa::db::{self, UserStore};
use agentqa::dispatch::Dispatcher;
use agentqa::llm::create_provider;
use agentqa::observability::{init_default_logging, HealthMonitor};
use agentqa::routing::LlmClassifier;
use agentqa::server::{self, AppState};
use agentqa::workers::{ApiWorkerClient, GuiWorkerClient};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// LLM-classified task router for QA requests
#[derive(Parser)]
#[command(name = "agentqa")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "AGENTQA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the WebSocket, REST and health routes
    Run,
    /// Validate configuration
    Config {
        /// Print the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["agentqa.toml", "config/agentqa.toml"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    info!("Starting agentqa v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_gateway(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(
    config_path: Option<&Path>,
) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .ok_or("No configuration file found. Pass -c/--config or create agentqa.toml")?,
    };

    info!("Loading configuration from: {}", path.display());
    Ok(GatewayConfig::load_from_file(&path)?)
}

/// Wire every dependency from configuration
async fn build_state(config: &GatewayConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let provider = create_provider(&config.llm, config.get_llm_api_key()?)?;

    let classifier = LlmClassifier::new(provider.clone(), config.llm.model.clone())
        .with_temperature(config.llm.temperature)
        .with_structured_output(config.llm.structured_output);

    let general = GeneralAgent::new(
        provider.clone(),
        Arc::new(InMemoryConversationStore::new()),
        config.llm.model.clone(),
        config.llm.general_system_prompt.clone(),
    )
    .with_temperature(config.llm.temperature)
    .with_max_tokens(config.llm.max_tokens);

    let dispatcher = Dispatcher::new(
        Arc::new(classifier),
        Arc::new(general),
        GuiWorkerClient::from_config(&config.workers)?,
        ApiWorkerClient::from_config(&config.workers),
    );

    let pool = db::connect(&config.database.url, config.database.max_connections).await?;
    let users = UserStore::new(pool);
    let auth = AuthService::new(
        users.clone(),
        PasswordHasher::new(config.auth.bcrypt_cost)?,
        TokenIssuer::new(&config.get_jwt_secret()?, config.auth.token_ttl_minutes),
    );

    Ok(AppState {
        dispatcher: Arc::new(dispatcher),
        auth,
        health: Arc::new(HealthMonitor::new(users, provider)),
    })
}

async fn run_gateway(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config).await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(
        llm_provider = %config.llm.provider,
        model = %config.llm.model,
        gui_worker = %config.workers.gui_url,
        api_worker = %config.workers.api_url,
        "Gateway configured"
    );

    server::serve(state, addr, shutdown_signal()).await?;

    info!("Application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

fn handle_config_command(
    config: &GatewayConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
