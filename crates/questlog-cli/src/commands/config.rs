//! Configuration management commands.

use std::path::PathBuf;

use clap::Subcommand;
use questlog_core::profile::{ProfileSettings, Theme};
use questlog_core::Config;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Update configuration values
    Set {
        /// Default theme: aurora, sunset, ocean, or midnight
        #[arg(long)]
        theme: Option<String>,
        /// Default accent color (#RRGGBB)
        #[arg(long)]
        accent: Option<String>,
        /// Database file location
        #[arg(long)]
        database_path: Option<PathBuf>,
    },
    /// Reset the configuration to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Show => print_json(&Config::load()?),
        ConfigAction::Set {
            theme,
            accent,
            database_path,
        } => {
            let mut config = Config::load()?;
            if let Some(theme) = theme.as_deref() {
                config.ui.theme = Theme::parse(theme)?;
            }
            if let Some(accent) = accent {
                ProfileSettings {
                    theme: None,
                    accent: Some(accent.clone()),
                }
                .validate()?;
                config.ui.accent = accent;
            }
            if let Some(path) = database_path {
                config.storage.database_path = Some(path);
            }
            config.save()?;
            print_json(&config)
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
            Ok(())
        }
    }
}
