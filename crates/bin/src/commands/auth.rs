//! Session commands: login, logout, verify.

use satchel::{Carrier, CleanupOutcome};

use crate::cli::LoginArgs;
use crate::output::print_field;

pub async fn login(carrier: &Carrier, args: &LoginArgs) -> satchel::Result<()> {
    let session = carrier.session().login(&args.username, &args.password).await?;
    println!("logged in as {}", session.username);
    print_field("user id", session.user_id);
    print_field("admin", session.is_admin);
    print_field("expires", render_expiry(session.expires_at));
    Ok(())
}

pub async fn logout(carrier: &Carrier) -> satchel::Result<()> {
    match carrier.session().logout().await {
        CleanupOutcome::Completed => {
            println!("logged out, local state cleared");
            Ok(())
        }
        CleanupOutcome::RestartRequired { reason } => {
            println!("logged out; relaunch required: {reason}");
            std::process::exit(2);
        }
    }
}

pub async fn verify(carrier: &Carrier) -> satchel::Result<()> {
    if carrier.session().verify_session().await {
        println!("session valid");
    } else {
        println!("session invalid or backend unreachable, log in again");
        std::process::exit(1);
    }
    Ok(())
}

/// Render an epoch-millis expiry for the operator.
fn render_expiry(millis: u64) -> String {
    use satchel::{Clock, SystemClock};
    let now = SystemClock.now_millis();
    if millis <= now {
        return "expired".to_string();
    }
    let days = (millis - now) / (24 * 60 * 60 * 1000);
    format!("in {days} day(s)")
}
