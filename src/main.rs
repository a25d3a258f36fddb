use clap::Parser;
use tracing::{error, info, warn};

use storage_metrics::config::{load_config, print_schema};
use storage_metrics::metrics::{self, StorageMetrics};
use storage_metrics::startup;
use storage_metrics::utils::logger::init_logging;

/// Prometheus exporter for the session storage pipeline metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the configuration JSON schema and exit
    #[arg(long)]
    schema: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.schema {
        if let Err(e) = print_schema() {
            eprintln!("Error printing configuration schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let config = load_config();

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        std::process::exit(1);
    }

    let exporter_metrics = match StorageMetrics::with_buckets(&config.buckets) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to build storage metrics");
            std::process::exit(1);
        }
    };

    // Pipeline code recording through the free functions shares this set.
    if metrics::install(exporter_metrics.clone()).is_err() {
        warn!("Global storage metrics were already initialized; configured buckets apply to the exporter set only");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting storage metrics exporter");

    if let Err(e) = startup::run(&config, exporter_metrics).await {
        error!(error = %e, "Storage metrics exporter failed");
        std::process::exit(1);
    }
}
