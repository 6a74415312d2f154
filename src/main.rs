use clap::Parser;
use olric_exporter::cli::Cli;
use olric_exporter::client::OlricClient;
use olric_exporter::logging::init_tracing;
use olric_exporter::metrics::{PrometheusExporter, UpCollector};
use olric_exporter::Result;
use prometheus::Registry;
use std::process;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level, cli.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!(error = %e, "olric_exporter exited with error");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!(version = olric_exporter::VERSION, "Starting olric_exporter");

    let config = cli.exporter_config()?;
    let web = cli.web_config()?;
    info!(
        address = %config.address,
        timeout = ?config.timeout,
        probe = %config.probe,
        "Probing Olric"
    );

    let registry = Registry::new();
    let collector = UpCollector::new(OlricClient::new(&config), config.logger.clone())?;
    registry.register(Box::new(collector))?;

    #[cfg(target_os = "linux")]
    registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

    PrometheusExporter::new(registry, web)
        .start(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
