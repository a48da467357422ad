//! tagwatch - notifies you when new moulinette results land

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagwatch::cli::{Cli, Commands, MockCommands};
use tagwatch::error::Result;

mod commands;
mod utils;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { url, interval } => commands::cmd_watch(&url, interval),
        Commands::Check { url, json } => commands::cmd_check(&url, json),
        Commands::Status { json } => commands::cmd_status(json),
        Commands::Serve { port, host } => commands::cmd_serve(&host, port),

        Commands::Mock(mock_cmd) => match mock_cmd {
            MockCommands::Add {
                name,
                percent,
                status,
                server,
            } => commands::cmd_mock_add(&server, name, percent, status),
            MockCommands::List { server } => commands::cmd_mock_list(&server),
            MockCommands::Reset { server } => commands::cmd_mock_reset(&server),
        },
    }
}
