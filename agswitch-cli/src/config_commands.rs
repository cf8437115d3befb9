use anyhow::Result;
use colored::Colorize;

use agswitch_core::modules::config as core_config;
use agswitch_core::{AppConfig, DataPaths};

pub fn show_config(paths: &DataPaths, json: bool) -> Result<()> {
    let config = core_config::load_config(paths)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", "Switch Configuration:".cyan().bold());
        println!("  Data dir: {}", paths.root().display());
        for key in KEYS {
            println!("  {}: {}", key, read_value(&config, key).unwrap_or_default());
        }
    }
    Ok(())
}

const KEYS: [&str; 6] = [
    "apply_identity_profile",
    "process_exit_timeout_ms",
    "restart_after_switch",
    "target_product",
    "target_executable",
    "target_args",
];

fn read_value(config: &AppConfig, key: &str) -> Option<String> {
    let value = match key {
        "apply_identity_profile" => config.apply_identity_profile.to_string(),
        "process_exit_timeout_ms" => config.process_exit_timeout_ms.to_string(),
        "restart_after_switch" => config.restart_after_switch.to_string(),
        "target_product" => config.target_product.clone(),
        "target_executable" => config.target_executable.clone().unwrap_or_else(|| "-".to_string()),
        "target_args" => config.target_args.as_ref().map_or_else(|| "-".to_string(), |a| a.join(" ")),
        _ => return None,
    };
    Some(value)
}

/// Parse `value` into `key`; an empty value clears optional keys.
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<()> {
    let parse_bool = |v: &str| {
        v.parse::<bool>().map_err(|_| anyhow::anyhow!("Invalid boolean: {}", v))
    };
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

    match key {
        "apply_identity_profile" => config.apply_identity_profile = parse_bool(value)?,
        "restart_after_switch" => config.restart_after_switch = parse_bool(value)?,
        "process_exit_timeout_ms" => {
            config.process_exit_timeout_ms = value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("Invalid timeout: {}", value))?;
        },
        "target_product" => {
            if value.is_empty() {
                anyhow::bail!("target_product cannot be empty");
            }
            config.target_product = value.to_string();
        },
        "target_executable" => config.target_executable = optional(value),
        "target_args" => {
            config.target_args =
                optional(value).map(|v| v.split_whitespace().map(str::to_string).collect());
        },
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

pub fn get_config_value(paths: &DataPaths, key: &str) -> Result<()> {
    let config = core_config::load_config(paths)?;
    let value = read_value(&config, key).ok_or_else(|| anyhow::anyhow!("Unknown config key: {}", key))?;
    println!("{}", value);
    Ok(())
}

pub fn set_config_value(paths: &DataPaths, key: &str, value: &str) -> Result<()> {
    let mut config = core_config::load_config(paths)?;
    apply_value(&mut config, key, value)?;
    core_config::save_config(paths, &config)?;

    println!("{} Config updated: {} = {}", "✓".green(), key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_is_readable() {
        let config = AppConfig::new();
        for key in KEYS {
            assert!(read_value(&config, key).is_some(), "{key}");
        }
        assert!(read_value(&config, "proxy.port").is_none());
    }

    #[test]
    fn test_apply_value_parses_and_clears() {
        let mut config = AppConfig::new();
        apply_value(&mut config, "process_exit_timeout_ms", "2500").expect("timeout");
        apply_value(&mut config, "target_args", "--foo --bar").expect("args");
        assert_eq!(config.process_exit_timeout_ms, 2500);
        assert_eq!(config.target_args, Some(vec!["--foo".to_string(), "--bar".to_string()]));

        apply_value(&mut config, "target_args", "").expect("clear");
        assert_eq!(config.target_args, None);

        assert!(apply_value(&mut config, "apply_identity_profile", "maybe").is_err());
        assert!(apply_value(&mut config, "target_product", "").is_err());
        assert!(apply_value(&mut config, "nope", "1").is_err());
    }
}
