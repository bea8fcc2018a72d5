use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use satchel::{Carrier, CarrierConfig, VerifyFallback};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

const DEFAULT_STORE_FILE: &str = "satchel.json";

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("satchel=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let store_path = if cli.ephemeral {
        None
    } else {
        Some(
            cli.store
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE)),
        )
    };

    let config = CarrierConfig {
        backend_url: cli.backend_url.clone(),
        request_timeout_secs: cli.timeout_secs,
        store_path,
        verify_fallback: if cli.assume_valid_offline {
            VerifyFallback::AssumeValid
        } else {
            VerifyFallback::AssumeInvalid
        },
    };

    let carrier = match Carrier::open(config).await {
        Ok(carrier) => carrier,
        Err(e) if e.is_store_unavailable() => {
            eprintln!("local store unusable: {e}");
            eprintln!("run `satchel emergency --yes-really` to wipe local state");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("failed to open carrier: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(backend = %cli.backend_url, "carrier ready");

    let result = match &cli.command {
        Commands::Login(args) => commands::auth::login(&carrier, args).await,
        Commands::Logout => commands::auth::logout(&carrier).await,
        Commands::Verify => commands::auth::verify(&carrier).await,
        Commands::Status => commands::content::status(&carrier).await,
        Commands::Download => commands::content::download(&carrier).await,
        Commands::Upload => commands::content::upload(&carrier).await,
        Commands::Serve(args) => commands::serve::serve(&carrier, args).await,
        Commands::Settings(args) => commands::content::settings(&carrier, &args.action).await,
        Commands::DeleteSynced => commands::content::delete_synced(&carrier).await,
        Commands::ClearContent { yes } => {
            commands::content::clear_content(&carrier, *yes).await
        }
        Commands::Reset { yes } => commands::maintenance::reset(&carrier, *yes).await,
        Commands::Emergency { yes_really } => {
            commands::maintenance::emergency(&carrier, *yes_really).await
        }
    };

    if let Err(e) = result {
        if e.is_network_error() {
            eprintln!("network error: {e}");
            eprintln!("check connectivity and retry");
        } else if e.is_auth_error() {
            eprintln!("not authorized: {e}");
        } else {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}
