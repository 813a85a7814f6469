//! Pure aggregation over history entries plus the weekly adherence query.

use chrono::{Days, NaiveDate};
use rusqlite::Connection;

use crate::db::DatabaseError;
use crate::models::enums::IntakeStatus;
use crate::models::schedule::Schedule;
use crate::schedule::{dose_slots, occurs_on};

use super::types::{DayGroup, HistoryEntry, HistoryFilter};

/// Keep entries matching every set criterion.
pub fn apply_filter(entries: Vec<HistoryEntry>, filter: &HistoryFilter) -> Vec<HistoryEntry> {
    entries
        .into_iter()
        .filter(|entry| {
            if let Some(date) = filter.date {
                if entry.taken_at.date() != date {
                    return false;
                }
            }
            if let Some(medications) = &filter.medications {
                if !medications.contains(&entry.group_name) {
                    return false;
                }
            }
            if let Some(frames) = &filter.time_frames {
                if !frames.contains(&entry.frame) {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Group by calendar day, newest day first, newest entry first within a day.
pub fn group_by_day(mut entries: Vec<HistoryEntry>) -> Vec<DayGroup> {
    entries.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));

    let mut days: Vec<DayGroup> = Vec::new();
    for entry in entries {
        let date = entry.taken_at.date();
        match days.last_mut() {
            Some(day) if day.date == date => day.entries.push(entry),
            _ => days.push(DayGroup {
                date,
                entries: vec![entry],
            }),
        }
    }
    days
}

/// Consecutive trailing all-taken days, scanning backward from the most
/// recent logged day. A day containing any missed or skipped log ends the
/// streak.
pub fn current_streak(days: &[DayGroup]) -> u32 {
    let mut streak = 0;
    for day in days {
        if day
            .entries
            .iter()
            .all(|e| e.status == IntakeStatus::Taken)
        {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Taken logs against scheduled dose slots over the trailing 7 days, as a
/// rounded percent capped at 100.
pub fn weekly_adherence(conn: &Connection, today: NaiveDate) -> Result<u32, DatabaseError> {
    let window_start = today - Days::new(6);

    let mut stmt = conn.prepare(
        "SELECT schedule_type, schedule_data, start_date, end_date
         FROM dose_configurations",
    )?;
    let configs = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, Option<String>>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut scheduled = 0usize;
    for (schedule_type, schedule_data, start_date, end_date) in configs {
        let schedule = Schedule::from_row(&schedule_type, schedule_data.as_deref())?;
        let start_date = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d").map_err(|_| {
            DatabaseError::ConstraintViolation(format!("invalid date '{start_date}'"))
        })?;
        let end_date = end_date
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                    DatabaseError::ConstraintViolation(format!("invalid date '{s}'"))
                })
            })
            .transpose()?;

        let per_day = dose_slots(&schedule).len();
        scheduled += window_start
            .iter_days()
            .take(7)
            .filter(|day| occurs_on(&schedule, start_date, end_date, *day))
            .count()
            * per_day;
    }

    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM intake_logs
         WHERE status = 'taken' AND date(taken_at) BETWEEN ?1 AND ?2",
        rusqlite::params![
            window_start.format("%Y-%m-%d").to_string(),
            today.format("%Y-%m-%d").to_string()
        ],
        |r| r.get(0),
    )?;

    if scheduled == 0 {
        return Ok(0);
    }
    Ok(((taken as f64 * 100.0 / scheduled as f64).round() as u32).min(100))
}
