use anyhow::Result;
use clap::Parser;
use errors::LookupError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;
pub mod ux_error;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .init();

    let outcome = match cli.command {
        Commands::Search(args) => commands::search::run(args).await,
        Commands::HostnameToDn(args) => commands::dn::hostname_to_dn(args),
        Commands::DnToHostname(args) => commands::dn::dn_to_hostname(args),
        Commands::Completion(args) => commands::completion::run(args)
    };

    if let Err(err) = outcome {
        match err.downcast_ref::<LookupError>() {
            Some(lookup_error) => ux_error::from_lookup_error(lookup_error).display(),
            None => output::error(&format!("{err:#}"))
        }
        std::process::exit(1);
    }

    Ok(())
}
