use anyhow::{Context, Result};

use agswitch_core::modules::config as core_config;
use agswitch_core::{AccountService, DataPaths};

use crate::cli::{AccountCommands, ConfigCommands, ProfileCommands};
use crate::{account_commands, config_commands, profile_commands};

/// Service wired against the local Antigravity installation.
fn open_service(paths: &DataPaths) -> Result<AccountService> {
    let config = core_config::load_config_or_default(paths);
    AccountService::system(paths.clone(), config)
        .context("Antigravity installation not found (is it installed and started once?)")
}

/// Accepts either an account ID or its email.
pub async fn resolve_account_id(service: &AccountService, identifier: &str) -> Result<String> {
    let accounts = service.list_accounts().await?;
    accounts
        .into_iter()
        .find(|a| a.id == identifier || a.email == identifier)
        .map(|a| a.id)
        .with_context(|| format!("Account not found: {}", identifier))
}

pub async fn handle_account_command(paths: &DataPaths, cmd: AccountCommands) -> Result<()> {
    let service = open_service(paths)?;
    match cmd {
        AccountCommands::List { json } => account_commands::list_accounts(&service, json).await,
        AccountCommands::Add => account_commands::add_account(&service).await,
        AccountCommands::Switch { identifiers, json } => {
            account_commands::switch_accounts(&service, &identifiers, json).await
        },
        AccountCommands::CloudSwitch { backup, profile } => {
            account_commands::cloud_switch(&service, &backup, profile.as_deref()).await
        },
        AccountCommands::Remove { identifier } => {
            account_commands::remove_account(&service, &identifier).await
        },
    }
}

pub async fn handle_profile_command(paths: &DataPaths, cmd: ProfileCommands) -> Result<()> {
    let service = open_service(paths)?;
    match cmd {
        ProfileCommands::Show { identifier, json } => {
            profile_commands::show_profiles(&service, &identifier, json).await
        },
        ProfileCommands::Preview => profile_commands::preview(&service),
        ProfileCommands::Bind { identifier, mode } => {
            profile_commands::bind(&service, &identifier, mode.into()).await
        },
        ProfileCommands::BindFile { identifier, file } => {
            profile_commands::bind_file(&service, &identifier, &file).await
        },
        ProfileCommands::Apply { identifier } => profile_commands::apply(&service, &identifier).await,
        ProfileCommands::Restore { identifier, revision } => {
            profile_commands::restore(&service, &identifier, &revision).await
        },
        ProfileCommands::Delete { identifier, revision } => {
            profile_commands::delete(&service, &identifier, &revision).await
        },
        ProfileCommands::Baseline { identifier } => {
            profile_commands::restore_baseline(&service, &identifier).await
        },
        ProfileCommands::BackupStorage => {
            let path = service.backup_identity_storage().await?;
            println!("{}", path.display());
            Ok(())
        },
        ProfileCommands::Folder => {
            service.open_identity_storage_folder()?;
            Ok(())
        },
    }
}

pub fn handle_config_command(paths: &DataPaths, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show { json } => config_commands::show_config(paths, json),
        ConfigCommands::Get { key } => config_commands::get_config_value(paths, &key),
        ConfigCommands::Set { key, value } => config_commands::set_config_value(paths, &key, &value),
    }
}
