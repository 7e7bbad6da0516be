use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agritrust_core::adapters::PostgresBatchRepository;
use agritrust_core::cli::{
    self, Cli, Commands, DbCommands, ProvisionCommands,
};
use agritrust_core::config::Config;
use agritrust_core::ipfs::PinningClient;
use agritrust_core::middleware::request_logger::request_logger_middleware;
use agritrust_core::ports::{BatchRepository, EventLog, ImageStore, TokenMinter};
use agritrust_core::services::listings::ListingCache;
use agritrust_core::services::registration::RegistrationService;
use agritrust_core::{create_app, db, startup, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Provision(ProvisionCommands::Topic { memo }) => {
            cli::handle_provision_topic(&config, &memo).await
        }
        Commands::Provision(ProvisionCommands::Token { name, symbol, memo }) => {
            cli::handle_provision_token(&config, &name, &symbol, &memo).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let report = startup::validate_environment(&config, &pool).await?;
    report.print();
    if !report.is_valid() {
        anyhow::bail!("startup validation failed");
    }

    let ledger_client = Arc::new(cli::ledger_client_from_config(&config));
    tracing::info!(
        network = config.ledger_network.as_str(),
        gateway = %config.ledger_gateway_url,
        "Ledger gateway client initialized"
    );

    let images: Option<Arc<dyn ImageStore>> =
        match (&config.pinning_api_url, &config.pinning_api_token) {
            (Some(url), Some(token)) => {
                Some(Arc::new(PinningClient::new(url.clone(), token.clone())))
            }
            _ => {
                tracing::warn!("pinning credentials not configured, image uploads disabled");
                None
            }
        };

    let repository: Arc<dyn BatchRepository> =
        Arc::new(PostgresBatchRepository::new(pool.clone()));
    let listings = Arc::new(ListingCache::new());

    let events: Arc<dyn EventLog> = ledger_client.clone();
    let minter: Arc<dyn TokenMinter> = ledger_client;
    let registration = Arc::new(RegistrationService::new(
        events,
        minter,
        images,
        repository.clone(),
        listings.clone(),
        config.batch_topic_id.clone(),
        config.batch_token_id.clone(),
    ));

    let state = AppState {
        db: pool,
        repository,
        registration,
        listings,
    };

    let app = create_app(state)
        .layer(axum::middleware::from_fn_with_state(
            config.clone(),
            request_logger_middleware,
        ))
        .layer(build_cors(&config)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors(config: &Config) -> anyhow::Result<CorsLayer> {
    let raw = match &config.cors_allowed_origins {
        Some(raw) if raw.trim() != "*" => raw,
        _ => return Ok(CorsLayer::permissive()),
    };

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}
