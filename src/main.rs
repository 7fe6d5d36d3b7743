use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use vcache::config::Overrides;
use vcache::protocol::{run_console, run_once};
use vcache::{Client, Config, Store};

/// In-process key-value cache console
#[derive(Parser, Debug)]
#[command(name = "vcache", version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,

    /// Number of lock shards, overrides the config file
    #[arg(long)]
    shards: Option<usize>,

    /// Log level, overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single command (e.g. `SET key value`) instead of the console
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let overrides = Overrides {
        shards: args.shards,
        log_level: args.log_level,
    };
    let config = Config::load(args.config.as_deref(), &overrides)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting vcache, version {}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(Store::with_shards(config.store.shards));
    let client = Client::with_store(store);

    if args.command.is_empty() {
        run_console(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), &client).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let reply = run_once(args.command, &client);
    println!("{}", reply);
    Ok(ExitCode::from(reply.exit_status()))
}
