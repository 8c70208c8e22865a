//! Check-in records and the orchestrating engine.
//!
//! `CheckinEngine` composes the pure engines (streak, XP, perfect day,
//! badges) into the transactional flows the service layer exposes:
//! performing a check-in, undoing one, using a freeze token, and creating
//! a goal (which can unlock the goal-count badge). Each flow runs inside
//! one repository transaction; a failure anywhere aborts every write.
//!
//! Idempotency: at most one checkin exists per (goal, task-or-none, date).
//! Re-performing an existing key returns the stored row with zero XP and
//! no side effects, which makes client retries and double-taps safe.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badge::{self, Badge, BadgeContext, BadgeKey, CATALOG};
use crate::error::{CoreError, Result};
use crate::goal::{xp_per_check_or_default, Goal, GoalWithRecurrence, NewGoal};
use crate::perfect_day;
use crate::profile::Profile;
use crate::repo::Repository;
use crate::streak::{self, StreakAction};
use crate::xp::{self, PERFECT_DAY_BONUS};

/// A recorded check-in. `task_id` is `None` for goal-level check-ins.
///
/// `xp_earned` snapshots the goal's `xp_per_check` at check-in time, so a
/// later change to the goal can't skew an undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub task_id: Option<Uuid>,
    pub date: NaiveDate,
    pub xp_earned: u32,
    pub created_at: DateTime<Utc>,
}

/// Streak change reported when a check-in moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDelta {
    pub action: StreakAction,
    pub new_streak: u32,
    pub is_new_best: bool,
}

/// Everything a check-in did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResult {
    pub checkin: Checkin,
    /// XP credited by this call: check-in XP plus any perfect-day bonus;
    /// zero when the call was an idempotent replay
    pub xp_earned: u32,
    pub profile: Profile,
    /// Present only when the streak actually moved
    pub streak: Option<StreakDelta>,
    pub badges_unlocked: Vec<Badge>,
    pub is_perfect_day: bool,
    /// Bonus credited by this call; zero if the day was already logged
    pub perfect_day_bonus: u32,
}

/// Outcome of an undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub undone: bool,
    pub profile: Profile,
    pub is_perfect_day: bool,
}

/// Outcome of spending a freeze token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeOutcome {
    pub success: bool,
    pub freeze_tokens: u32,
    pub streak_preserved: u32,
}

/// Outcome of creating a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCreated {
    pub goal: GoalWithRecurrence,
    pub badges_unlocked: Vec<Badge>,
}

/// Orchestrator for all state-mutating flows.
pub struct CheckinEngine<'a, R: Repository> {
    repo: &'a R,
}

impl<'a, R: Repository> CheckinEngine<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Perform a check-in for `(date, goal, task?)`.
    ///
    /// Steps, in order, inside one transaction: idempotency check, row
    /// insert, XP credit (level-up grants a freeze token to every active
    /// goal), streak transition, perfect-day check with one-shot bonus,
    /// then a single badge evaluation over the combined context.
    pub fn perform_checkin(
        &self,
        date: NaiveDate,
        goal_id: Uuid,
        task_id: Option<Uuid>,
    ) -> Result<CheckinResult> {
        let goal = self.repo.goal(goal_id)?;
        if let Some(task_id) = task_id {
            self.repo.task(goal_id, task_id)?;
        }

        if let Some(existing) = self.repo.checkin_for_key(goal_id, task_id, date)? {
            tracing::debug!(target: "questlog::checkin", %goal_id, %date, "replayed existing checkin");
            return Ok(CheckinResult {
                checkin: existing,
                xp_earned: 0,
                profile: self.repo.profile()?,
                streak: None,
                badges_unlocked: Vec::new(),
                is_perfect_day: self.is_perfect_day(date)?,
                perfect_day_bonus: 0,
            });
        }

        self.repo.with_transaction(|repo| {
            let is_first_checkin = repo.total_checkin_count()? == 0;

            let checkin = Checkin {
                id: Uuid::new_v4(),
                goal_id,
                task_id,
                date,
                xp_earned: goal.goal.xp_per_check,
                created_at: Utc::now(),
            };
            repo.insert_checkin(&checkin)?;

            let gain = xp::apply_gain(repo.profile()?.xp_total, checkin.xp_earned);
            repo.update_profile_xp(gain.new_total, gain.new_level)?;
            if gain.did_level_up {
                repo.grant_freeze_token_to_active_goals()?;
            }

            let update = streak::evaluate_checkin(
                goal.goal.cadence,
                goal.goal.last_period_key.as_deref(),
                goal.goal.current_streak,
                goal.goal.best_streak,
                date,
            )?;
            if update.action != StreakAction::None {
                repo.update_goal_streak(goal_id, update.streak, update.best_streak, &update.period_key)?;
                if update.freeze_token_earned {
                    repo.add_freeze_tokens(goal_id, 1)?;
                }
            }

            let (is_perfect_day, perfect_day_bonus) = log_perfect_day_if_new(repo, date)?;
            let mut xp_earned = checkin.xp_earned;
            if perfect_day_bonus > 0 {
                let bonus_gain = xp::apply_gain(repo.profile()?.xp_total, perfect_day_bonus);
                repo.update_profile_xp(bonus_gain.new_total, bonus_gain.new_level)?;
                xp_earned += perfect_day_bonus;
            }

            let profile = repo.profile()?;
            let ctx = BadgeContext {
                xp_total: profile.xp_total,
                level: profile.level,
                perfect_days: profile.perfect_days,
                new_streak: Some(update.streak),
                is_first_checkin,
                goal_count: None,
            };
            let badges_unlocked = unlock_badges(repo, &ctx)?;

            tracing::debug!(
                target: "questlog::checkin",
                %goal_id,
                %date,
                xp_earned,
                action = ?update.action,
                streak = update.streak,
                "checkin recorded"
            );

            Ok(CheckinResult {
                checkin,
                xp_earned,
                profile,
                streak: (update.action != StreakAction::None).then_some(StreakDelta {
                    action: update.action,
                    new_streak: update.streak,
                    is_new_best: update.streak == update.best_streak,
                }),
                badges_unlocked,
                is_perfect_day,
                perfect_day_bonus,
            })
        })
    }

    /// Undo the check-in for `(date, goal, task?)`: subtract its XP
    /// (floored at zero) and hard-delete the row.
    ///
    /// Streak state, badge unlocks, and the perfect-day log are one-way
    /// and stay put. A later re-check-in re-evaluates the streak from the
    /// goal's current `last_period_key`, which may classify differently
    /// than the undone one did; that asymmetry is accepted.
    pub fn undo_checkin(
        &self,
        date: NaiveDate,
        goal_id: Uuid,
        task_id: Option<Uuid>,
    ) -> Result<UndoResult> {
        let checkin = self
            .repo
            .checkin_for_key(goal_id, task_id, date)?
            .ok_or_else(|| CoreError::not_found("checkin"))?;

        self.repo.with_transaction(|repo| {
            let (new_total, new_level) = xp::apply_loss(repo.profile()?.xp_total, checkin.xp_earned);
            repo.update_profile_xp(new_total, new_level)?;
            repo.delete_checkin(checkin.id)
        })?;

        Ok(UndoResult {
            undone: true,
            profile: self.repo.profile()?,
            is_perfect_day: self.is_perfect_day(date)?,
        })
    }

    /// Create a goal after validating its cadence/recurrence combination,
    /// and evaluate the goal-count badge.
    pub fn create_goal(&self, new_goal: NewGoal) -> Result<GoalCreated> {
        new_goal.validate().map_err(CoreError::Validation)?;

        let goal = Goal {
            id: Uuid::new_v4(),
            title: new_goal.title,
            cadence: new_goal.cadence,
            color: new_goal.color,
            xp_per_check: xp_per_check_or_default(new_goal.xp_per_check),
            archived: false,
            current_streak: 0,
            best_streak: 0,
            last_period_key: None,
            freeze_tokens: 0,
            created_at: Utc::now(),
        };
        let recurrence = new_goal.recurrence.filter(|spec| !spec.is_empty());

        let badges_unlocked = self.repo.with_transaction(|repo| {
            repo.insert_goal(&goal, recurrence.as_ref())?;
            let ctx = BadgeContext {
                goal_count: Some(repo.active_goal_count()?),
                ..Default::default()
            };
            unlock_badges(repo, &ctx)
        })?;

        Ok(GoalCreated {
            goal: self.repo.goal(goal.id)?,
            badges_unlocked,
        })
    }

    /// Spend a freeze token to cover the single period missed before
    /// `date`'s period. Not eligible means no state change.
    pub fn use_freeze(&self, goal_id: Uuid, date: NaiveDate) -> Result<FreezeOutcome> {
        let goal = self.repo.goal(goal_id)?;
        let eligibility = streak::freeze_eligibility(
            goal.goal.cadence,
            goal.goal.last_period_key.as_deref(),
            goal.goal.freeze_tokens,
            date,
        )?;

        let missed_period = match eligibility.missed_period {
            Some(period) if eligibility.eligible => period,
            _ => {
                return Ok(FreezeOutcome {
                    success: false,
                    freeze_tokens: goal.goal.freeze_tokens,
                    streak_preserved: 0,
                })
            }
        };

        self.repo
            .with_transaction(|repo| repo.consume_freeze(goal_id, &missed_period))?;

        let updated = self.repo.goal(goal_id)?;
        tracing::debug!(target: "questlog::streak", %goal_id, %missed_period, "freeze token used");
        Ok(FreezeOutcome {
            success: true,
            freeze_tokens: updated.goal.freeze_tokens,
            streak_preserved: updated.goal.current_streak,
        })
    }

    /// Freeze eligibility probe without side effects.
    pub fn freeze_eligibility(
        &self,
        goal_id: Uuid,
        date: NaiveDate,
    ) -> Result<streak::FreezeEligibility> {
        let goal = self.repo.goal(goal_id)?;
        streak::freeze_eligibility(
            goal.goal.cadence,
            goal.goal.last_period_key.as_deref(),
            goal.goal.freeze_tokens,
            date,
        )
    }

    /// Read-only perfect-day check for `date` (no logging, no bonus).
    pub fn is_perfect_day(&self, date: NaiveDate) -> Result<bool> {
        let goals = self.repo.goals(false)?;
        let checked = self.repo.goal_ids_checked_on(date)?;
        Ok(perfect_day::evaluate(&goals, &checked, date))
    }
}

/// Confirm and, if new, log a perfect day. Returns (is_perfect, bonus);
/// the bonus is zero when the date was already credited.
fn log_perfect_day_if_new<R: Repository>(repo: &R, date: NaiveDate) -> Result<(bool, u32)> {
    let goals = repo.goals(false)?;
    let checked = repo.goal_ids_checked_on(date)?;
    if !perfect_day::evaluate(&goals, &checked, date) {
        return Ok((false, 0));
    }
    if repo.is_perfect_day_logged(date)? {
        return Ok((true, 0));
    }
    repo.log_perfect_day(date, Utc::now())?;
    repo.increment_perfect_days()?;
    tracing::debug!(target: "questlog::perfect_day", %date, "perfect day logged");
    Ok((true, PERFECT_DAY_BONUS))
}

/// Evaluate badge rules, persist the newly unlocked ones, and return them
/// as catalog entries stamped with the unlock time.
fn unlock_badges<R: Repository>(repo: &R, ctx: &BadgeContext) -> Result<Vec<Badge>> {
    let already = repo.unlocked_badge_keys()?;
    let keys = badge::evaluate(ctx, &already);
    let now = Utc::now();
    let mut unlocked = Vec::with_capacity(keys.len());
    for key in keys {
        repo.unlock_badge(key, now)?;
        unlocked.push(catalog_badge(key, now));
        tracing::debug!(target: "questlog::badge", badge = %key, "badge unlocked");
    }
    Ok(unlocked)
}

fn catalog_badge(key: BadgeKey, unlocked_at: DateTime<Utc>) -> Badge {
    let def = CATALOG
        .iter()
        .find(|def| def.key == key)
        .expect("every key has a catalog entry");
    Badge {
        key,
        title: def.title.to_string(),
        description: def.description.to_string(),
        icon: def.icon.to_string(),
        unlocked_at: Some(unlocked_at),
    }
}
