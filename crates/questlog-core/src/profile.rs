//! The profile singleton: XP total, derived level, perfect-day counter,
//! and display settings.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::goal::validate_hex_color;

/// Color theme for the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Aurora,
    Sunset,
    Ocean,
    Midnight,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Aurora => "aurora",
            Theme::Sunset => "sunset",
            Theme::Ocean => "ocean",
            Theme::Midnight => "midnight",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "aurora" => Ok(Theme::Aurora),
            "sunset" => Ok(Theme::Sunset),
            "ocean" => Ok(Theme::Ocean),
            "midnight" => Ok(Theme::Midnight),
            other => Err(ValidationError::invalid_value(
                "theme",
                format!("unknown theme: {other}"),
            )),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Aurora
    }
}

/// Singleton profile row.
///
/// `level` is cached but always recomputed from `xp_total` on write; it
/// exists so reads don't re-derive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub xp_total: u32,
    pub level: u32,
    pub perfect_days: u32,
    pub theme: Theme,
    /// Accent color, `#RRGGBB`
    pub accent: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            xp_total: 0,
            level: 1,
            perfect_days: 0,
            theme: Theme::default(),
            accent: "#7C3AED".to_string(),
        }
    }
}

/// Display settings update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub theme: Option<Theme>,
    pub accent: Option<String>,
}

impl ProfileSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(accent) = &self.accent {
            validate_hex_color("accent", accent)?;
        }
        Ok(())
    }
}
