//! Serve command: run the LAN responder until interrupted.

use satchel::Carrier;

use crate::cli::ServeArgs;
use crate::output::print_field;

pub async fn serve(carrier: &Carrier, args: &ServeArgs) -> satchel::Result<()> {
    let responder = carrier.responder();
    let address = responder
        .start(&format!("{}:{}", args.host, args.port))
        .await?;

    let status = carrier.sync().status().await?;
    print_field("serving on", address);
    print_field("topics cached", status.topics);
    match &status.sync_info {
        Some(info) => print_field("last sync", &info.timestamp),
        None => print_field("last sync", "never (peers will see empty lists)"),
    }
    println!("press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    responder.stop().await?;
    println!("stopped");
    Ok(())
}
