//! CLI argument definitions for the Satchel binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Satchel offline content carrier
#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(about = "Satchel: offline-first content carrier")]
#[command(version)]
pub struct Cli {
    /// Base URL of the remote backend
    #[arg(
        long,
        env = "SATCHEL_BACKEND_URL",
        default_value = "http://127.0.0.1:8000/"
    )]
    pub backend_url: Url,

    /// Store file location (defaults to satchel.json in the working
    /// directory; pass --ephemeral for a memory-only store)
    #[arg(long, env = "SATCHEL_STORE")]
    pub store: Option<PathBuf>,

    /// Keep the store in memory only, discarding it on exit
    #[arg(long, conflicts_with = "store")]
    pub ephemeral: bool,

    /// Timeout for remote calls, in seconds
    #[arg(long, env = "SATCHEL_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// Treat an unreachable backend as a still-valid session during verify
    #[arg(long, env = "SATCHEL_ASSUME_VALID_OFFLINE")]
    pub assume_valid_offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to the remote backend
    Login(LoginArgs),
    /// Log out and wipe local state
    Logout,
    /// Verify the current session against the backend
    Verify,
    /// Show sync status and pending registration count
    Status,
    /// Download the content snapshot from the backend
    Download,
    /// Upload pending registrations to the backend
    Upload,
    /// Serve cached content to peer devices on the local network
    Serve(ServeArgs),
    /// Show or change settings
    Settings(SettingsArgs),
    /// Delete registrations already acknowledged by the backend
    DeleteSynced,
    /// Delete all downloaded content
    ClearContent {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Reset the database (forced store deletion)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Emergency cleanup: wipe every kind of local state
    Emergency {
        /// First confirmation; an interactive prompt still follows
        #[arg(long)]
        yes_really: bool,
    },
}

/// Arguments for the login command
#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Backend username
    #[arg(short, long)]
    pub username: String,

    /// Backend password (prefer the env var over the flag in shared shells)
    #[arg(short, long, env = "SATCHEL_PASSWORD")]
    pub password: String,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "SATCHEL_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "SATCHEL_HOST")]
    pub host: String,
}

/// Arguments for the settings command
#[derive(clap::Args, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Show the current settings
    Show,
    /// Change settings
    Set {
        /// Enable or disable automatic deletion of old synced registrations
        #[arg(long)]
        auto_delete: Option<bool>,

        /// Days to keep synced registrations before auto-deletion
        #[arg(long)]
        delete_after_days: Option<u64>,
    },
}
