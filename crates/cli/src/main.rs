use clap::Parser;
use fakedns_domain::CliOverrides;
use fakedns_infrastructure::FakeDns;
use tracing::{info, warn};

mod bootstrap;

#[derive(Parser)]
#[command(name = "fakedns")]
#[command(version)]
#[command(about = "Programmable fake DNS responder for integration tests")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS port, 0 picks a free one
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        port: cli.port,
        bind_address: cli.bind.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting fakedns v{}", env!("CARGO_PKG_VERSION"));
    info!(
        port = config.server.port,
        bind_address = %config.server.bind_address,
        edge_zone = %config.server.edge_zone,
        records = config.records.len(),
        tsig_keys = config.tsig_keys.len(),
        "Configuration loaded"
    );

    let server = config
        .records
        .iter()
        .cloned()
        .fold(FakeDns::new(config.settings()?), FakeDns::add_record);

    let mut server = server.start().await;
    if let Some(e) = server.error() {
        anyhow::bail!("fakedns failed to start: {}", e);
    }

    let shutdown = server.shutdown_token();
    server
        .run_workload(|addr| async move {
            info!(address = %addr, "fakedns ready, press Ctrl+C to stop");
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for Ctrl+C");
                        shutdown.cancelled().await;
                    }
                }
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    info!("fakedns stopped");
    Ok(())
}
