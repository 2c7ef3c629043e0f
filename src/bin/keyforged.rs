// ABOUTME: Binary entry point — `init` bootstraps a data directory, `start` serves the HTTP API
// ABOUTME: Exit codes per §6: 0 normal shutdown, 1 startup fatal, 2 configuration error

use clap::{Parser, Subcommand};
use keyforge::config::ServerConfig;
use keyforge::lifecycle;

#[derive(Parser)]
#[command(name = "keyforged")]
#[command(about = "Self-hosted team credential server: SSH certificate authority and access broker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap a fresh data directory: generates the CA key pair, hashes
    /// the admin token, and writes the server configuration row.
    Init,
    /// Load an initialized data directory and serve the HTTP API.
    Start,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            std::process::exit(2);
        }
    };

    keyforge::logging::init(config.log_format);

    let result = match args.command {
        Command::Init => lifecycle::init(&config).await,
        Command::Start => lifecycle::start(config).await,
    };

    if let Err(error) = result {
        tracing::error!(%error, "fatal error");
        // Environment-variable parsing failures are caught above as
        // configuration errors (exit 2); anything reaching here is a
        // startup-fatal condition (missing/invalid keys, unreadable data
        // directory, an already-initialized directory).
        std::process::exit(1);
    }
}
