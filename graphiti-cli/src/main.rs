use clap::{Parser, Subcommand};
use graphiti_monitor::{
    always_connected, ConnectivityManager, GraphitiError, HttpProbe, MonitorConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "graphiti", version, about = "Graphiti MCP connectivity utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, env = "GRAPHITI_CONFIG", default_value = "graphiti.json", global = true)]
    config: PathBuf,
    /// Graphiti server to probe; overrides the config file and GRAPHITI_URL
    #[arg(long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start monitoring Graphiti connectivity
    Monitor,
    /// Print current connectivity status
    Status {
        /// Run one connectivity check before printing
        #[arg(long)]
        check: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<MonitorConfig, GraphitiError> {
    let mut config = MonitorConfig::load_or_default(&cli.config);
    // Create the probe up front so GRAPHITI_API_KEY and GRAPHITI_TIMEOUT_MS apply to it
    if let Some(url) = &cli.url {
        config.set_probe_url(url.as_str());
    }
    config.apply_env()?;
    // --url wins over GRAPHITI_URL
    if let Some(url) = &cli.url {
        config.set_probe_url(url.as_str());
    }

    config.validate()?;
    Ok(config)
}

fn build_manager(config: MonitorConfig) -> Result<ConnectivityManager, GraphitiError> {
    match config.probe {
        Some(probe) => {
            tracing::info!("[GRAPHITI] probing {}", probe.url);
            Ok(ConnectivityManager::new(config.retry, HttpProbe::new(probe)?))
        }
        None => {
            tracing::warn!("[GRAPHITI] no url configured, using a check that always succeeds");
            Ok(ConnectivityManager::new(config.retry, always_connected()))
        }
    }
}

fn print_status(manager: &ConnectivityManager) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&manager.get_status())?);
    Ok(())
}

async fn run_monitor(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let manager = Arc::new(build_manager(config)?);
    graphiti_monitor::set_global_manager(Arc::clone(&manager));
    let retry = manager.config();
    tracing::info!(
        "[GRAPHITI] monitoring group {}: max_attempts={}, interval={}s, cool_down={}ms",
        retry.group_id,
        retry.max_attempts,
        retry.interval_seconds,
        retry.cool_down_ms_after_max
    );

    manager.start().await;
    print_status(&manager)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("[GRAPHITI] interrupted, stopping monitor");
    manager.stop();
    print_status(&manager)?;
    Ok(())
}

async fn run_status(config: MonitorConfig, check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let manager = build_manager(config)?;
    if check {
        manager.start().await;
        manager.stop();
    }
    print_status(&manager)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Monitor => run_monitor(config).await,
        Command::Status { check } => run_status(config, check).await,
    }
}
