use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};
mod actor;
mod api;
use crate::api::{
    extract::{handlers::extract_config, ExtractService},
    health::health_config,
    validation,
};
mod config;
mod logging;
mod shutdown;
mod worker;
use crate::config::Config;
use crate::shutdown::ShutdownCoordinator;

#[derive(Parser)]
#[command(name = "job-extractor", version, about = "Fan job-search points out to a scraping actor and aggregate the postings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Extract job results for the given points once and print them as JSON
    Extract {
        /// Job-search query terms
        #[arg(required = true)]
        points: Vec<String>,
        /// Points processed together per batch (overrides FAN_OUT_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<NonZeroUsize>,
    },
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().map_err(std::io::Error::other)?;

    logging::init(&config.log_dir)?;

    // Process-wide cap on in-flight actor calls, shared by every request
    let permits = Arc::new(Semaphore::new(config.max_concurrent_calls.get()));

    let service = ExtractService::from_config(&config, permits.clone())
        .map_err(std::io::Error::other)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, service, permits).await,
        Command::Extract { points, concurrency } => {
            let service = match concurrency {
                Some(concurrency) => service.with_concurrency(concurrency),
                None => service,
            };
            extract_once(service, points).await
        }
    }
}

async fn serve(config: Config, service: ExtractService, permits: Arc<Semaphore>) -> std::io::Result<()> {
    info!("Starting job-extractor application");
    info!("Configuration loaded successfully:");
    info!("  - Actor: {} at {}", config.actor_id, config.apify_base_url);
    info!("  - API key configured: {}", config.apify_api_key.is_some());
    info!("  - Fan-out concurrency: {}", config.fan_out_concurrency);
    info!("  - Max concurrent actor calls: {}", config.max_concurrent_calls);
    info!("  - Dataset page limit: {:?}", config.dataset_page_limit);
    info!("  - Max payload size: {} bytes", config.max_payload_size);

    let service = web::Data::new(service);
    let max_payload_size = config.max_payload_size;
    let cors_origin = config.cors_allowed_origin.clone();

    let server = HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST"])
                .allow_any_header()
                .max_age(3600),
            None => Cors::permissive(),
        };

        // Configure payload size limits globally
        let payload_config = web::PayloadConfig::default()
            .limit(max_payload_size);

        App::new()
            .wrap(cors)
            .app_data(service.clone()) // Share ExtractService across workers
            .app_data(payload_config) // Global payload size limit
            .app_data(validation::json_config(max_payload_size)) // Global validation config
            .configure(health_config) // Health check endpoints
            .configure(extract_config)
    })
    .disable_signals();

    info!("Server starting on http://{}:{}", config.host, config.port);

    // Bind and start the server
    let server = server
        .bind((config.host.as_str(), config.port))?
        .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    // Spawn server in background
    let server_task = tokio::spawn(server);

    // Create shutdown coordinator and wait for shutdown signal
    let coordinator = ShutdownCoordinator::new(server_handle, server_task, permits);

    coordinator.wait_for_shutdown().await
}

/// One-shot extraction from the terminal; JSON goes to stdout
async fn extract_once(service: ExtractService, points: Vec<String>) -> std::io::Result<()> {
    match service.extract(points).await {
        Ok(response) => {
            let body = serde_json::to_string_pretty(&response).map_err(std::io::Error::other)?;
            println!("{}", body);
            Ok(())
        }
        Err(err) => {
            error!("Extraction failed: {}", err);
            let body = serde_json::to_string_pretty(&err.envelope()).map_err(std::io::Error::other)?;
            println!("{}", body);
            std::process::exit(1);
        }
    }
}
