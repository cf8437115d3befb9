use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

use agswitch_core::{AccountService, BindMode};
use agswitch_types::models::{DeviceProfile, DeviceProfilesSnapshot};

use crate::account_commands::{format_timestamp, read_profile};
use crate::commands::resolve_account_id;

fn print_profile(title: &str, profile: Option<&DeviceProfile>) {
    println!("{}", title.cyan().bold());
    match profile {
        Some(p) => {
            println!("  machineId:    {}", p.machine_id);
            println!("  macMachineId: {}", p.mac_machine_id);
            println!("  devDeviceId:  {}", p.dev_device_id);
            println!("  sqmId:        {}", p.sqm_id);
        },
        None => println!("  {}", "(none)".dimmed()),
    }
}

fn print_snapshot(snapshot: &DeviceProfilesSnapshot) {
    print_profile("On disk", snapshot.current_storage.as_ref());
    print_profile("Bound", snapshot.bound_profile.as_ref());
    print_profile("Baseline", snapshot.baseline.as_ref());

    if snapshot.history.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Version", "Label", "Created", "Device ID", ""]);
    for version in &snapshot.history {
        let marker = if version.is_current {
            Cell::new("current").fg(Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(&version.id),
            Cell::new(&version.label),
            Cell::new(format_timestamp(version.created_at)),
            Cell::new(&version.profile.dev_device_id),
            marker,
        ]);
    }
    println!("{table}");
}

pub async fn show_profiles(service: &AccountService, identifier: &str, json: bool) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let snapshot = service.get_identity_profiles(&id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

pub fn preview(service: &AccountService) -> Result<()> {
    let profile = service.preview_generate_identity_profile();
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

pub async fn bind(service: &AccountService, identifier: &str, mode: BindMode) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let profile = service.bind_identity_profile(&id, mode).await?;
    println!(
        "{} Bound {} profile {} to {}",
        "✓".green(),
        mode.label(),
        profile.dev_device_id,
        identifier.green()
    );
    Ok(())
}

pub async fn bind_file(service: &AccountService, identifier: &str, file: &Path) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let profile = read_profile(file)?;
    let profile = service.bind_identity_profile_with_payload(&id, profile).await?;
    println!("{} Bound profile {} to {}", "✓".green(), profile.dev_device_id, identifier.green());
    Ok(())
}

pub async fn apply(service: &AccountService, identifier: &str) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let profile = service.apply_bound_identity_profile(&id).await?;
    println!("{} Applied profile {}", "✓".green(), profile.dev_device_id);
    Ok(())
}

pub async fn restore(service: &AccountService, identifier: &str, version: &str) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let profile = service.restore_identity_profile_revision(&id, version).await?;
    println!("{} Restored {} ({})", "✓".green(), version, profile.dev_device_id);
    Ok(())
}

pub async fn delete(service: &AccountService, identifier: &str, version: &str) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    service.delete_identity_profile_revision(&id, version).await?;
    println!("{} Deleted revision {}", "✓".green(), version);
    Ok(())
}

pub async fn restore_baseline(service: &AccountService, identifier: &str) -> Result<()> {
    let id = resolve_account_id(service, identifier).await?;
    let profile = service.restore_baseline_profile(&id).await?;
    println!(
        "{} Baseline {} bound to {}; it is written on the next switch",
        "✓".green(),
        profile.dev_device_id,
        identifier.green()
    );
    Ok(())
}
