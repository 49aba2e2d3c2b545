use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lna_test_server::config::{
    DEFAULT_HEADER_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT, MULTI_PORTS, ServerConfig, Variant,
};
use lna_test_server::{http_api, launcher};

#[derive(Parser)]
#[command(name = "lna-test-server")]
#[command(about = "HTTP fixture for testing browser Local Network Access restrictions")]
#[command(version)]
struct Cli {
    /// Port to listen on (1-65535, default 8080)
    #[arg(value_parser = clap::value_parser!(u16).range(1..), conflicts_with = "multiple")]
    port: Option<u16>,
    /// Start test servers on ports 8080, 8000, 3000 and 5000
    #[arg(short, long)]
    multiple: bool,
    /// Response shape to serve
    #[arg(long, value_enum, default_value_t = Variant::Policy)]
    variant: Variant,
    /// Address to bind to
    #[arg(short = 'H', long, default_value_t = DEFAULT_HOST)]
    host: IpAddr,
    /// Seconds a client may take to send request headers
    #[arg(long, default_value_t = DEFAULT_HEADER_TIMEOUT_SECS)]
    header_timeout_secs: u64,
}

/// Parse arguments; a bad value (such as an invalid port) also prints usage.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::ValueValidation | ErrorKind::InvalidValue) => {
            let _ = e.print();
            eprintln!("\n{}", Cli::command().render_usage());
            std::process::exit(e.exit_code());
        }
        Err(e) => e.exit(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = parse_cli();

    let config = ServerConfig {
        host: cli.host,
        variant: cli.variant,
        header_timeout: Duration::from_secs(cli.header_timeout_secs),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping test servers");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Without a signal handler the only way out is killing the
                // process; keep the sender alive so listeners stay up.
                tracing::warn!("unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    if cli.multiple {
        launcher::run_multiple(&config, &MULTI_PORTS, shutdown_rx).await?;
    } else {
        let port = cli.port.unwrap_or(DEFAULT_PORT);
        http_api::run_server(config.addr(port), &config, shutdown_rx).await?;
    }

    Ok(())
}
