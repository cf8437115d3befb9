use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use futures::future::join_all;
use std::path::Path;

use agswitch_core::{AccountService, AppError};
use agswitch_types::models::{
    Account, AccountBackupData, DeviceProfile, SwitchMetricBucket, SwitchScope,
};

use crate::commands::resolve_account_id;

pub async fn list_accounts(service: &AccountService, json: bool) -> Result<()> {
    let accounts = service.list_accounts().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Email", "Name", "ID", "Profile", "Last used"]);

    for acc in &accounts {
        table.add_row(vec![
            Cell::new(&acc.email),
            Cell::new(&acc.name),
            Cell::new(&acc.id),
            profile_cell(acc),
            Cell::new(format_timestamp(acc.last_used)),
        ]);
    }

    println!("{table}");
    println!("\n{} accounts total", accounts.len());
    Ok(())
}

fn profile_cell(acc: &Account) -> Cell {
    match (&acc.device_profile, acc.current_version()) {
        (Some(_), Some(version)) => Cell::new(&version.label).fg(Color::Green),
        (Some(_), None) => Cell::new("baseline").fg(Color::Cyan),
        (None, _) => Cell::new("-").fg(Color::DarkGrey),
    }
}

pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn add_account(service: &AccountService) -> Result<()> {
    println!("{}", "Reading signed-in identity...".cyan());
    let acc = service.add_account_snapshot().await?;
    println!("{} Account captured: {} ({})", "✓".green(), acc.email.green(), acc.id);
    Ok(())
}

/// Runs every switch concurrently; the guard admits them in argument order.
pub async fn switch_accounts(
    service: &AccountService,
    identifiers: &[String],
    json: bool,
) -> Result<()> {
    let mut ids = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        ids.push(resolve_account_id(service, identifier).await?);
    }

    let results = join_all(ids.iter().map(|id| service.switch_account(id))).await;
    let metrics = service.switch_metrics();

    if json {
        let reports: Vec<serde_json::Value> = results
            .iter()
            .zip(&ids)
            .map(|(result, id)| match result {
                Ok(report) => serde_json::json!({ "id": id, "report": report }),
                Err(e) => serde_json::json!({ "id": id, "error": e, "category": e.category() }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "results": reports,
                "metrics": metrics,
            }))?
        );
    } else {
        for (result, id) in results.iter().zip(&ids) {
            print_switch_result(id, result);
        }
        if ids.len() > 1 || metrics.local.switch_failure > 0 {
            print_metrics(SwitchScope::Local, &metrics.local);
        }
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} switches failed", failed, ids.len());
    }
    Ok(())
}

fn print_switch_result<T>(id: &str, result: &Result<T, AppError>) {
    match result {
        Ok(_) => println!("{} Switched to {}", "✓".green(), id.green()),
        Err(AppError::Switch(failure)) => {
            println!("{} {} [{}]: {}", "✗".red(), id, failure.reason, failure.message);
            match failure.rollback_succeeded {
                Some(true) => println!("  {}", "device profile rolled back".yellow()),
                Some(false) => println!("  {}", "device profile rollback FAILED".red().bold()),
                None => {},
            }
        },
        Err(e) => println!("{} {}: {}", "✗".red(), id, e),
    }
}

fn print_metrics(scope: SwitchScope, bucket: &SwitchMetricBucket) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Scope", "Success", "Failure", "Rollbacks", "Rollback failures"]);
    table.add_row(vec![
        Cell::new(scope),
        Cell::new(bucket.switch_success).fg(Color::Green),
        Cell::new(bucket.switch_failure).fg(Color::Red),
        Cell::new(bucket.rollback_attempt),
        Cell::new(bucket.rollback_failure),
    ]);
    println!("{table}");

    if let Some(last) = &bucket.last_failure {
        println!("  last failure: [{}] {}", last.reason, last.message);
    }
}

pub async fn cloud_switch(
    service: &AccountService,
    backup_path: &Path,
    profile_path: Option<&Path>,
) -> Result<()> {
    let content = std::fs::read_to_string(backup_path).context("Failed to read backup file")?;
    let backup: AccountBackupData =
        serde_json::from_str(&content).context("Failed to parse backup JSON")?;
    let profile = profile_path.map(read_profile).transpose()?;
    let email = backup.account.email.clone();

    let result = service.switch_cloud_account(backup, profile).await;
    print_switch_result(&email, &result);
    let _report = result?;
    Ok(())
}

pub fn read_profile(path: &Path) -> Result<DeviceProfile> {
    let content = std::fs::read_to_string(path).context("Failed to read profile file")?;
    serde_json::from_str(&content).context("Failed to parse device profile JSON")
}

pub async fn remove_account(service: &AccountService, identifier: &str) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    service.delete_account(&id).await?;
    println!("{} Account removed: {}", "✓".green(), identifier.green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(i64::MAX), "-");
    }

    #[test]
    fn test_read_profile_rejects_partial_json() {
        let dir = std::env::temp_dir().join(format!("agswitch-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("profile.json");
        std::fs::write(&path, r#"{"machineId":"auth0|user_x"}"#).expect("write");

        assert!(read_profile(&path).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
