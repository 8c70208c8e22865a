//! Integration tests for perfect-day accounting and the read models.

use chrono::{Duration, NaiveDate, Utc};
use questlog_core::goal::{NewGoal, RecurrenceSpec};
use questlog_core::repo::Repository;
use questlog_core::review;
use questlog_core::service;
use questlog_core::task::NewTask;
use questlog_core::xp::PERFECT_DAY_BONUS;
use questlog_core::{Cadence, CheckinEngine, Database};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn daily_goal(title: &str) -> NewGoal {
    NewGoal {
        title: title.to_string(),
        cadence: Cadence::Daily,
        color: "#22C55E".to_string(),
        xp_per_check: Some(10),
        recurrence: None,
    }
}

/// Goals are only eligible from their creation date on, so perfect-day
/// scenarios run against today.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[test]
fn test_perfect_day_requires_every_eligible_goal() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let a = engine.create_goal(daily_goal("Read")).unwrap().goal;
    let b = engine.create_goal(daily_goal("Run")).unwrap().goal;

    let first = engine.perform_checkin(today(), a.goal.id, None).unwrap();
    assert!(!first.is_perfect_day);
    assert_eq!(first.perfect_day_bonus, 0);

    let second = engine.perform_checkin(today(), b.goal.id, None).unwrap();
    assert!(second.is_perfect_day);
    assert_eq!(second.perfect_day_bonus, PERFECT_DAY_BONUS);
    assert_eq!(second.xp_earned, 10 + PERFECT_DAY_BONUS);
    assert_eq!(second.profile.perfect_days, 1);
}

#[test]
fn test_perfect_day_bonus_is_awarded_once() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let a = engine.create_goal(daily_goal("Read")).unwrap().goal;

    let result = engine.perform_checkin(today(), a.goal.id, None).unwrap();
    assert!(result.is_perfect_day);
    assert_eq!(result.perfect_day_bonus, PERFECT_DAY_BONUS);

    // A second goal checked the same day keeps the day perfect but the
    // bonus is already spent
    let b = engine.create_goal(daily_goal("Run")).unwrap().goal;
    let again = engine.perform_checkin(today(), b.goal.id, None).unwrap();
    assert!(again.is_perfect_day);
    assert_eq!(again.perfect_day_bonus, 0);
    assert_eq!(again.xp_earned, 10);
    assert_eq!(db.profile().unwrap().perfect_days, 1);
}

#[test]
fn test_weekly_goals_do_not_gate_perfect_day() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let daily = engine.create_goal(daily_goal("Read")).unwrap().goal;
    engine
        .create_goal(NewGoal {
            title: "Gym".to_string(),
            cadence: Cadence::Weekly,
            color: "#F59E0B".to_string(),
            xp_per_check: Some(10),
            recurrence: Some(RecurrenceSpec {
                weekly_target: Some(3),
                ..Default::default()
            }),
        })
        .unwrap();

    // The unchecked weekly goal is not part of the eligible set
    let result = engine.perform_checkin(today(), daily.goal.id, None).unwrap();
    assert!(result.is_perfect_day);
}

#[test]
fn test_undo_recomputes_the_flag_but_keeps_the_log() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let a = engine.create_goal(daily_goal("Read")).unwrap().goal;

    engine.perform_checkin(today(), a.goal.id, None).unwrap();
    assert_eq!(db.profile().unwrap().perfect_days, 1);

    let undo = engine.undo_checkin(today(), a.goal.id, None).unwrap();
    // The day no longer qualifies right now...
    assert!(!undo.is_perfect_day);
    // ...but the credited log entry and counter are one-way
    assert_eq!(db.profile().unwrap().perfect_days, 1);
    assert!(db.is_perfect_day_logged(today()).unwrap());
}

#[test]
fn test_today_view_reports_period_progress() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);

    let plain = engine.create_goal(daily_goal("Read")).unwrap().goal;
    let task_mode = engine.create_goal(daily_goal("Workout")).unwrap().goal;
    let t1 = service::create_task(
        &db,
        task_mode.goal.id,
        NewTask {
            title: "Push-ups".to_string(),
            notes: None,
        },
    )
    .unwrap();
    service::create_task(
        &db,
        task_mode.goal.id,
        NewTask {
            title: "Plank".to_string(),
            notes: None,
        },
    )
    .unwrap();

    engine.perform_checkin(today(), plain.goal.id, None).unwrap();
    engine
        .perform_checkin(today(), task_mode.goal.id, Some(t1.id))
        .unwrap();

    let view = review::today_view(&db, today()).unwrap();
    assert_eq!(view.goals.len(), 2);

    let plain_view = view
        .goals
        .iter()
        .find(|g| g.goal.goal.id == plain.goal.id)
        .unwrap();
    assert_eq!(plain_view.period_progress.target, 1);
    assert_eq!(plain_view.period_progress.current, 1);
    assert!(plain_view.period_progress.completed);

    let task_view = view
        .goals
        .iter()
        .find(|g| g.goal.goal.id == task_mode.goal.id)
        .unwrap();
    assert_eq!(task_view.tasks.len(), 2);
    assert_eq!(task_view.period_progress.target, 2);
    assert_eq!(task_view.period_progress.current, 1);
    assert!(!task_view.period_progress.completed);

    // Both goals checked: the day is perfect and the badge feed carries
    // the fresh first-checkin unlock
    assert!(view.is_perfect_day);
    assert!(!view.recent_badges.is_empty());
}

#[test]
fn test_weekly_period_progress_counts_the_whole_week() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let goal = engine
        .create_goal(NewGoal {
            title: "Gym".to_string(),
            cadence: Cadence::Weekly,
            color: "#F59E0B".to_string(),
            xp_per_check: Some(10),
            recurrence: Some(RecurrenceSpec {
                weekly_target: Some(3),
                ..Default::default()
            }),
        })
        .unwrap()
        .goal;
    let id = goal.goal.id;

    // Monday and Wednesday of the same ISO week
    engine.perform_checkin(d("2024-03-04"), id, None).unwrap();
    engine.perform_checkin(d("2024-03-06"), id, None).unwrap();

    let view = review::today_view(&db, d("2024-03-07")).unwrap();
    let gym = view.goals.iter().find(|g| g.goal.goal.id == id).unwrap();
    assert_eq!(gym.period_progress.current, 2);
    assert_eq!(gym.period_progress.target, 3);
    assert!(!gym.period_progress.completed);
    // No checkin on the viewed date itself
    assert!(gym.checkins.is_empty());
}

#[test]
fn test_weekly_review_aggregates_days_and_totals() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let goal = engine.create_goal(daily_goal("Read")).unwrap().goal;
    let id = goal.goal.id;

    engine.perform_checkin(d("2024-03-04"), id, None).unwrap();
    engine.perform_checkin(d("2024-03-05"), id, None).unwrap();

    let review = review::weekly_review(&db, d("2024-03-04")).unwrap();
    assert_eq!(review.start_date, d("2024-03-04"));
    assert_eq!(review.end_date, d("2024-03-10"));
    assert_eq!(review.days.len(), 7);
    assert_eq!(review.days[0].xp_earned, 10);
    assert_eq!(review.days[0].checkins_count, 1);
    assert_eq!(review.days[2].checkins_count, 0);
    assert_eq!(review.totals.xp, 20);
    assert_eq!(review.totals.checkins, 2);

    assert_eq!(review.streak_highlights.len(), 1);
    assert_eq!(review.streak_highlights[0].current_streak, 2);
    assert_eq!(review.streak_highlights[0].goal_id, id);
}

#[test]
fn test_monthly_review_covers_the_calendar_month() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let goal = engine.create_goal(daily_goal("Read")).unwrap().goal;

    engine
        .perform_checkin(d("2024-02-29"), goal.goal.id, None)
        .unwrap();

    let review = review::monthly_review(&db, "2024-02").unwrap();
    assert_eq!(review.start_date, d("2024-02-01"));
    assert_eq!(review.end_date, d("2024-02-29"));
    assert_eq!(review.days.len(), 29);
    assert_eq!(review.totals.checkins, 1);
    assert_eq!(review.days[28].xp_earned, 10);
}

#[test]
fn test_perfect_days_land_in_review_ranges() {
    let db = Database::open_memory().unwrap();
    let engine = CheckinEngine::new(&db);
    let a = engine.create_goal(daily_goal("Read")).unwrap().goal;

    engine.perform_checkin(today(), a.goal.id, None).unwrap();

    let start = today() - Duration::days(6);
    let review = review::weekly_review(&db, start).unwrap();
    assert_eq!(review.totals.perfect_days, 1);
    assert!(review.days.last().unwrap().is_perfect_day);

    let logged = db.perfect_days_in(start, today()).unwrap();
    assert_eq!(logged, vec![today()]);
}
