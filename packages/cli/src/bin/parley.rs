use clap::{Parser, ValueEnum};
use parley_cli::{run_server, Config};
use parley_config::RUST_LOG;
use std::process;
use tracing::error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley comments API server")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides PARLEY_PORT)")]
    port: Option<u16>,

    #[arg(long, help = "SQLite database URL (overrides PARLEY_DATABASE_URL)")]
    database_url: Option<String>,

    #[arg(long, help = "Disable per-client rate limiting")]
    no_rate_limit: bool,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(RUST_LOG)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load .env file
    dotenvy::dotenv().ok();
    init_tracing(cli.log_format);

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            process::exit(2);
        }
    };

    if let Some(port) = cli.port.filter(|port| *port != 0) {
        config.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }
    if cli.no_rate_limit {
        config.limiter.enabled = false;
    }

    if let Err(e) = run_server(config).await {
        error!(error = %e, "Server exited with an error");
        process::exit(1);
    }
}
