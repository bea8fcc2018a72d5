//! Destructive maintenance commands: reset and emergency cleanup.

use satchel::{Carrier, CleanupOutcome};

use crate::output::confirm;

pub async fn reset(carrier: &Carrier, yes: bool) -> satchel::Result<()> {
    if !yes && !confirm("Delete the entire local store?", "y") {
        return Ok(());
    }
    match carrier.cleanup().force_delete().await {
        CleanupOutcome::Completed => {
            println!("store deleted; it will be recreated on next use");
            Ok(())
        }
        CleanupOutcome::RestartRequired { reason } => {
            println!("store deletion incomplete: {reason}");
            println!("relaunch satchel before continuing");
            std::process::exit(2);
        }
    }
}

/// Emergency cleanup is double-confirmed: the flag and an interactive
/// prompt. It is never triggered automatically.
pub async fn emergency(carrier: &Carrier, yes_really: bool) -> satchel::Result<()> {
    if !yes_really {
        println!("emergency cleanup wipes every kind of local state");
        println!("run again with --yes-really if you are sure");
        std::process::exit(1);
    }
    if !confirm("Wipe ALL local state?", "RESET") {
        return Ok(());
    }
    match carrier.cleanup().emergency_reset().await {
        CleanupOutcome::RestartRequired { reason } => {
            println!("{reason}");
            std::process::exit(2);
        }
        CleanupOutcome::Completed => {
            // emergency_reset always requires a relaunch; treat this the same
            println!("emergency cleanup complete, relaunch satchel");
            std::process::exit(2);
        }
    }
}
