//! Profile and badge commands.

use clap::Subcommand;
use questlog_core::profile::{ProfileSettings, Theme};
use questlog_core::repo::Repository;
use questlog_core::service;
use questlog_core::xp;

use super::{open_db, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile with level progress
    Show,
    /// Update display settings
    Set {
        /// Theme: aurora, sunset, ocean, or midnight
        #[arg(long)]
        theme: Option<String>,
        /// Accent color (#RRGGBB)
        #[arg(long)]
        accent: Option<String>,
    },
}

pub fn run(action: ProfileAction) -> CliResult {
    let db = open_db()?;

    match action {
        ProfileAction::Show => {
            let profile = db.profile()?;
            let progress = xp::level_progress(profile.xp_total);
            print_json(&serde_json::json!({
                "profile": profile,
                "levelProgress": progress,
            }))
        }
        ProfileAction::Set { theme, accent } => {
            let settings = ProfileSettings {
                theme: theme.as_deref().map(Theme::parse).transpose()?,
                accent,
            };
            print_json(&service::update_profile_settings(&db, settings)?)
        }
    }
}

pub fn run_badges() -> CliResult {
    let db = open_db()?;
    print_json(&db.badges()?)
}
