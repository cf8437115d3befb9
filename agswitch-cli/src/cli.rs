use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use agswitch_core::BindMode;

const LONG_VERSION: &str = concat!(env!("GIT_VERSION"), " (built ", env!("BUILD_TIME"), ")");

#[derive(Parser)]
#[command(
    name = "agswitch",
    about = "Switch the signed-in account and device fingerprint of Antigravity",
    version = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, env = "AGSWITCH_DATA_DIR", help = "Data directory (default ~/.agswitch)")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(subcommand, about = "Manage captured accounts")]
    Account(AccountCommands),

    #[command(subcommand, about = "Manage per-account device profiles")]
    Profile(ProfileCommands),

    #[command(subcommand, about = "View and modify configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum AccountCommands {
    #[command(about = "List captured accounts, most recently used first")]
    List {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Capture the account currently signed in to Antigravity")]
    Add,

    #[command(about = "Switch to one or more accounts, in the order given")]
    Switch {
        #[arg(required = true, help = "Email or account ID")]
        identifiers: Vec<String>,

        #[arg(short, long, help = "Output reports and metrics as JSON")]
        json: bool,
    },

    #[command(about = "Switch to an identity exported from another machine")]
    CloudSwitch {
        #[arg(help = "Path to a backup payload JSON file")]
        backup: PathBuf,

        #[arg(long, help = "Path to a device profile JSON file")]
        profile: Option<PathBuf>,
    },

    #[command(about = "Remove an account and its backup")]
    Remove {
        #[arg(help = "Email or account ID to remove")]
        identifier: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BindModeArg {
    /// Use the fingerprint currently on disk
    Capture,
    /// Generate a random fingerprint
    Generate,
}

impl From<BindModeArg> for BindMode {
    fn from(mode: BindModeArg) -> Self {
        match mode {
            BindModeArg::Capture => Self::Capture,
            BindModeArg::Generate => Self::Generate,
        }
    }
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    #[command(about = "Show on-disk, bound, baseline and historical profiles")]
    Show {
        #[arg(help = "Email or account ID")]
        identifier: String,

        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Print a freshly generated profile without applying it")]
    Preview,

    #[command(about = "Bind a captured or generated profile and apply it")]
    Bind {
        #[arg(help = "Email or account ID")]
        identifier: String,

        #[arg(long, value_enum, default_value = "generate")]
        mode: BindModeArg,
    },

    #[command(about = "Bind a profile read from a JSON file and apply it")]
    BindFile {
        #[arg(help = "Email or account ID")]
        identifier: String,

        #[arg(help = "Path to a device profile JSON file")]
        file: PathBuf,
    },

    #[command(about = "Write the account's bound profile to disk")]
    Apply {
        #[arg(help = "Email or account ID")]
        identifier: String,
    },

    #[command(about = "Restore a revision ('baseline', 'current' or a version ID)")]
    Restore {
        #[arg(help = "Email or account ID")]
        identifier: String,

        #[arg(value_name = "VERSION", help = "Revision to restore")]
        revision: String,
    },

    #[command(about = "Delete a non-current revision")]
    Delete {
        #[arg(help = "Email or account ID")]
        identifier: String,

        #[arg(value_name = "VERSION", help = "Version ID to delete")]
        revision: String,
    },

    #[command(about = "Bind the baseline profile without writing it")]
    Baseline {
        #[arg(help = "Email or account ID")]
        identifier: String,
    },

    #[command(about = "Copy storage.json to a timestamped backup")]
    BackupStorage,

    #[command(about = "Open the Antigravity storage folder")]
    Folder,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Get a specific configuration value")]
    Get {
        #[arg(help = "Configuration key (e.g., 'process_exit_timeout_ms')")]
        key: String,
    },

    #[command(about = "Set a configuration value")]
    Set {
        #[arg(help = "Configuration key")]
        key: String,

        #[arg(help = "New value")]
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_switch_accepts_several_accounts() {
        let cli = Cli::try_parse_from(["agswitch", "account", "switch", "a@example.com", "b"])
            .expect("parse");
        match cli.command {
            Commands::Account(AccountCommands::Switch { identifiers, json }) => {
                assert_eq!(identifiers, vec!["a@example.com", "b"]);
                assert!(!json);
            },
            _ => panic!("expected account switch"),
        }
    }

    #[test]
    fn test_revision_arguments_do_not_clash_with_version_flag() {
        let cli = Cli::try_parse_from(["agswitch", "profile", "restore", "acc", "baseline"])
            .expect("parse restore");
        match cli.command {
            Commands::Profile(ProfileCommands::Restore { identifier, revision }) => {
                assert_eq!(identifier, "acc");
                assert_eq!(revision, "baseline");
            },
            _ => panic!("expected profile restore"),
        }

        let cli = Cli::try_parse_from(["agswitch", "profile", "delete", "acc", "v-1"])
            .expect("parse delete");
        assert!(matches!(
            cli.command,
            Commands::Profile(ProfileCommands::Delete { revision, .. }) if revision == "v-1"
        ));
    }

    #[test]
    fn test_bind_mode_defaults_to_generate() {
        let cli = Cli::try_parse_from(["agswitch", "profile", "bind", "a"]).expect("parse");
        match cli.command {
            Commands::Profile(ProfileCommands::Bind { mode, .. }) => {
                assert_eq!(BindMode::from(mode), BindMode::Generate);
            },
            _ => panic!("expected profile bind"),
        }
    }
}
