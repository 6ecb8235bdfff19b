//! Allowgate - admin allowlist gatekeeper synced to a Cloudflare rules list.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use allowgate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Add { ip, description } => {
            allowgate::commands::add::run(&ip, &description, &cli.config).await
        }
        Commands::Remove { ip } => allowgate::commands::remove::run(&ip, &cli.config).await,
        Commands::Update { ip, description } => {
            allowgate::commands::update::run(&ip, &description, &cli.config).await
        }
        Commands::Rename {
            old_ip,
            new_ip,
            description,
        } => allowgate::commands::rename::run(&old_ip, &new_ip, &description, &cli.config).await,
        Commands::List => allowgate::commands::list::run(&cli.config).await,
        Commands::Check { ip } => allowgate::commands::check::run(&ip, &cli.config).await,
        Commands::Version => {
            println!("allowgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
