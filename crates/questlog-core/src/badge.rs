//! Achievement badges.
//!
//! The catalog is fixed: ten badges, each unlocked at most once and never
//! re-locked. The evaluator is a stateless rule table over a context
//! snapshot; it owns the already-unlocked guard, so callers can hand it
//! the same context repeatedly without re-triggering rewards.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Identity of a badge in the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKey {
    FirstCheckin,
    Streak7,
    Streak30,
    Streak100,
    Xp1000,
    Xp10000,
    Level10,
    PerfectDay10,
    PerfectDay50,
    Goals5,
}

impl BadgeKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKey::FirstCheckin => "first_checkin",
            BadgeKey::Streak7 => "streak_7",
            BadgeKey::Streak30 => "streak_30",
            BadgeKey::Streak100 => "streak_100",
            BadgeKey::Xp1000 => "xp_1000",
            BadgeKey::Xp10000 => "xp_10000",
            BadgeKey::Level10 => "level_10",
            BadgeKey::PerfectDay10 => "perfect_day_10",
            BadgeKey::PerfectDay50 => "perfect_day_50",
            BadgeKey::Goals5 => "goals_5",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        CATALOG
            .iter()
            .map(|def| def.key)
            .find(|key| key.as_str() == s)
            .ok_or_else(|| CoreError::invariant(format!("unknown badge key: {s}")))
    }
}

impl std::fmt::Display for BadgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static definition of a badge.
#[derive(Debug, Clone, Copy)]
pub struct BadgeDef {
    pub key: BadgeKey,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// The full badge catalog, seeded into storage on first open.
pub const CATALOG: [BadgeDef; 10] = [
    BadgeDef {
        key: BadgeKey::Streak7,
        title: "Week Warrior",
        description: "Reach a 7-day streak",
        icon: "🔥",
    },
    BadgeDef {
        key: BadgeKey::Streak30,
        title: "Monthly Master",
        description: "Reach a 30-day streak",
        icon: "⚡",
    },
    BadgeDef {
        key: BadgeKey::Streak100,
        title: "Century Club",
        description: "Reach a 100-day streak",
        icon: "💎",
    },
    BadgeDef {
        key: BadgeKey::Xp1000,
        title: "XP Collector",
        description: "Earn 1,000 XP",
        icon: "⭐",
    },
    BadgeDef {
        key: BadgeKey::Xp10000,
        title: "XP Hoarder",
        description: "Earn 10,000 XP",
        icon: "🌟",
    },
    BadgeDef {
        key: BadgeKey::PerfectDay10,
        title: "Perfect Ten",
        description: "Achieve 10 perfect days",
        icon: "✨",
    },
    BadgeDef {
        key: BadgeKey::PerfectDay50,
        title: "Consistency King",
        description: "Achieve 50 perfect days",
        icon: "👑",
    },
    BadgeDef {
        key: BadgeKey::Level10,
        title: "Double Digits",
        description: "Reach level 10",
        icon: "🎯",
    },
    BadgeDef {
        key: BadgeKey::Goals5,
        title: "Goal Getter",
        description: "Create 5 goals",
        icon: "📋",
    },
    BadgeDef {
        key: BadgeKey::FirstCheckin,
        title: "First Step",
        description: "Complete your first check-in",
        icon: "🚀",
    },
];

/// A catalog badge with its unlock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub key: BadgeKey,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Snapshot of everything the badge rules look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeContext {
    pub xp_total: u32,
    pub level: u32,
    pub perfect_days: u32,
    /// Streak just computed by the streak engine, if a check-in ran
    pub new_streak: Option<u32>,
    pub is_first_checkin: bool,
    /// Active goal count; supplied on goal creation only
    pub goal_count: Option<u32>,
}

/// Keys that newly qualify: every rule whose threshold the context meets
/// and whose badge is not already unlocked. All qualifying streak tiers
/// fire in the same call (a first 30-streak unlocks both `streak_7` and
/// `streak_30`).
pub fn evaluate(ctx: &BadgeContext, already_unlocked: &HashSet<BadgeKey>) -> Vec<BadgeKey> {
    let mut qualified = Vec::new();

    if ctx.is_first_checkin {
        qualified.push(BadgeKey::FirstCheckin);
    }

    if let Some(streak) = ctx.new_streak {
        for (threshold, key) in [
            (7, BadgeKey::Streak7),
            (30, BadgeKey::Streak30),
            (100, BadgeKey::Streak100),
        ] {
            if streak >= threshold {
                qualified.push(key);
            }
        }
    }

    for (threshold, key) in [(1000, BadgeKey::Xp1000), (10000, BadgeKey::Xp10000)] {
        if ctx.xp_total >= threshold {
            qualified.push(key);
        }
    }

    if ctx.level >= 10 {
        qualified.push(BadgeKey::Level10);
    }

    for (threshold, key) in [(10, BadgeKey::PerfectDay10), (50, BadgeKey::PerfectDay50)] {
        if ctx.perfect_days >= threshold {
            qualified.push(key);
        }
    }

    if ctx.goal_count.is_some_and(|count| count >= 5) {
        qualified.push(BadgeKey::Goals5);
    }

    qualified
        .into_iter()
        .filter(|key| !already_unlocked.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_key_once() {
        let keys: HashSet<_> = CATALOG.iter().map(|def| def.key).collect();
        assert_eq!(keys.len(), 10);
    }

    #[test]
    fn key_strings_roundtrip() {
        for def in CATALOG {
            assert_eq!(BadgeKey::parse(def.key.as_str()).unwrap(), def.key);
        }
        assert!(BadgeKey::parse("streak_9000").is_err());
    }

    #[test]
    fn streak_tiers_fire_together() {
        let ctx = BadgeContext {
            new_streak: Some(30),
            ..Default::default()
        };
        let unlocked = evaluate(&ctx, &HashSet::new());
        assert!(unlocked.contains(&BadgeKey::Streak7));
        assert!(unlocked.contains(&BadgeKey::Streak30));
        assert!(!unlocked.contains(&BadgeKey::Streak100));
    }

    #[test]
    fn already_unlocked_badges_never_refire() {
        let ctx = BadgeContext {
            xp_total: 2000,
            level: 12,
            ..Default::default()
        };
        let first = evaluate(&ctx, &HashSet::new());
        assert!(first.contains(&BadgeKey::Xp1000));
        assert!(first.contains(&BadgeKey::Level10));

        let unlocked: HashSet<_> = first.into_iter().collect();
        assert!(evaluate(&ctx, &unlocked).is_empty());
    }

    #[test]
    fn goal_count_rule_needs_explicit_count() {
        let ctx = BadgeContext::default();
        assert!(evaluate(&ctx, &HashSet::new()).is_empty());

        let ctx = BadgeContext {
            goal_count: Some(5),
            ..Default::default()
        };
        assert_eq!(evaluate(&ctx, &HashSet::new()), vec![BadgeKey::Goals5]);
    }

    #[test]
    fn first_checkin_badge() {
        let ctx = BadgeContext {
            is_first_checkin: true,
            new_streak: Some(1),
            xp_total: 10,
            level: 1,
            ..Default::default()
        };
        assert_eq!(evaluate(&ctx, &HashSet::new()), vec![BadgeKey::FirstCheckin]);
    }
}
