use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use labchem_enricher::config::AppConfig;
use labchem_enricher::ingest;
use labchem_enricher::pipeline::EnrichmentPipeline;
use labchem_enricher::registry::ManufacturerRegistry;
use labchem_enricher::utils::telemetry;
use labchem_enricher::web::{create_router, AppState};

#[derive(Parser)]
#[command(
    name = "labchem-enricher",
    about = "Enrich lab-supply product rows from manufacturer sites",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service
    Serve,

    /// Enrich a CSV file once and write the JSON report
    Enrich {
        /// CSV with "Company's Name", "Cat. No" and "Product Name" columns
        #[arg(short, long)]
        input: PathBuf,

        /// Only rows from this manufacturer (defaults to pipeline.target_manufacturer)
        #[arg(short, long, conflicts_with = "all")]
        manufacturer: Option<String>,

        /// Keep rows from every manufacturer
        #[arg(long)]
        all: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List manufacturer profiles in lookup order
    Manufacturers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = telemetry::init_tracing(&config.logging)?;

    let registry = Arc::new(
        ManufacturerRegistry::load(config.registry.profiles_file.as_deref())
            .context("Failed to load manufacturer registry")?,
    );

    match cli.command {
        Command::Serve => serve(config, registry).await?,

        Command::Enrich {
            input,
            manufacturer,
            all,
            output,
        } => {
            let pipeline = EnrichmentPipeline::from_config(registry, &config);
            let manufacturer = if all {
                None
            } else {
                manufacturer.or_else(|| pipeline.default_manufacturer().map(str::to_string))
            };

            let rows = ingest::read_path(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let report = pipeline.run(rows, manufacturer.as_deref()).await;
            let json = serde_json::to_string_pretty(&report)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Command::Manufacturers => {
            for profile in registry.profiles() {
                println!(
                    "{:<16} {:<10} {:<40} {}",
                    profile.name,
                    profile.prefix,
                    profile.base_url,
                    profile.catalog_pattern.as_str()
                );
            }
        }
    }

    Ok(())
}

async fn serve(config: AppConfig, registry: Arc<ManufacturerRegistry>) -> Result<()> {
    let metrics = telemetry::install_metrics(&config.metrics)?;
    let pipeline = Arc::new(EnrichmentPipeline::from_config(registry, &config));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(AppState {
        pipeline,
        config,
        metrics,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, starting graceful shutdown");
}
