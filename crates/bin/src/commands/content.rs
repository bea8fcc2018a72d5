//! Content and registration commands: status, download, upload, settings,
//! delete-synced, clear-content.

use satchel::Carrier;
use satchel::store::{SETTING_AUTO_DELETE, SETTING_DELETE_AFTER_DAYS};

use crate::cli::SettingsAction;
use crate::output::{confirm, print_field, print_table};

pub async fn status(carrier: &Carrier) -> satchel::Result<()> {
    let status = carrier.sync().status().await?;
    match &status.sync_info {
        Some(info) => print_field("last sync", &info.timestamp),
        None => print_field("last sync", "never"),
    }
    print_field("departments", status.departments);
    print_field("courses", status.courses);
    print_field("topics", status.topics);
    print_field("premium users", status.premium_users);
    print_field("pending registrations", status.pending_registrations);

    let session = carrier.session().get_session().await;
    match session {
        Some(session) => print_field("session", format!("active ({})", session.username)),
        None => print_field("session", "none"),
    }
    Ok(())
}

pub async fn download(carrier: &Carrier) -> satchel::Result<()> {
    if carrier.session().get_session().await.is_none() {
        println!("not logged in");
        std::process::exit(1);
    }
    let report = carrier.sync().download_snapshot().await?;
    println!("snapshot downloaded ({})", report.timestamp);
    print_field("departments", report.departments);
    print_field("courses", report.courses);
    print_field("topics", report.topics);
    print_field("premium users", report.users);
    Ok(())
}

pub async fn upload(carrier: &Carrier) -> satchel::Result<()> {
    if carrier.session().get_session().await.is_none() {
        println!("not logged in");
        std::process::exit(1);
    }
    let report = carrier.queue().upload_pending().await?;
    if report.uploaded == 0 {
        println!("nothing to upload");
        return Ok(());
    }
    println!("uploaded {} registration(s)", report.uploaded);
    print_field("created", report.created);
    print_field("duplicates", report.duplicates);
    if !report.errors.is_empty() {
        println!("{} record(s) rejected:", report.errors.len());
        for error in &report.errors {
            println!("  {error}");
        }
    }
    Ok(())
}

pub async fn settings(carrier: &Carrier, action: &SettingsAction) -> satchel::Result<()> {
    let store = carrier.store();
    match action {
        SettingsAction::Show => {
            print_field("auto delete", store.auto_delete_enabled().await?);
            print_field("delete after (days)", store.delete_after_days().await?);
        }
        SettingsAction::Set {
            auto_delete,
            delete_after_days,
        } => {
            if let Some(enabled) = auto_delete {
                store
                    .set_setting(SETTING_AUTO_DELETE, serde_json::json!(enabled))
                    .await?;
                print_field("auto delete", enabled);
            }
            if let Some(days) = delete_after_days {
                store
                    .set_setting(SETTING_DELETE_AFTER_DAYS, serde_json::json!(days))
                    .await?;
                print_field("delete after (days)", days);
            }
        }
    }
    Ok(())
}

pub async fn delete_synced(carrier: &Carrier) -> satchel::Result<()> {
    let removed = carrier.queue().delete_synced().await?;
    println!("deleted {removed} synced registration(s)");

    let remaining = carrier.queue().list_unsynced().await?;
    if !remaining.is_empty() {
        let rows: Vec<Vec<String>> = remaining
            .iter()
            .map(|r| vec![r.id.to_string(), r.name.clone(), r.code.clone()])
            .collect();
        println!("still pending:");
        print_table(&["id", "name", "code"], &rows);
    }
    Ok(())
}

pub async fn clear_content(carrier: &Carrier, yes: bool) -> satchel::Result<()> {
    if !yes && !confirm("Delete all downloaded content?", "y") {
        return Ok(());
    }
    carrier.sync().clear_content().await?;
    println!("content cleared");
    Ok(())
}
