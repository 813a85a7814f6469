//! Loading history entries and assembling the History screen.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::IntakeStatus;
use crate::schedule::bucket_for_time;

use super::aggregates::{apply_filter, current_streak, group_by_day, weekly_adherence};
use super::types::{HistoryData, HistoryEntry, HistoryFilter, HistoryStats};

/// All logged intakes, resolved to display entries.
pub fn fetch_entries(conn: &Connection) -> Result<Vec<HistoryEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT l.id, g.name, m.strength, m.strength_unit, l.status, l.taken_at
         FROM intake_logs l
         JOIN dose_configurations d ON d.id = l.dose_configuration_id
         JOIN medication_groups g ON g.id = d.group_id
         JOIN medications m ON m.id = d.medication_id
         ORDER BY l.taken_at DESC",
    )?;
    let raw = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(raw.len());
    for (id, group_name, strength, unit, status, taken_at) in raw {
        let taken_at = NaiveDateTime::parse_from_str(&taken_at, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| {
                DatabaseError::ConstraintViolation(format!("invalid timestamp '{taken_at}'"))
            })?;
        entries.push(HistoryEntry {
            log_id: Uuid::parse_str(&id).map_err(|_| {
                DatabaseError::ConstraintViolation(format!("invalid intake_log id '{id}'"))
            })?,
            group_name,
            strength_label: format!("{strength}{unit}"),
            status: IntakeStatus::from_str(&status)?,
            taken_at,
            frame: bucket_for_time(taken_at.time()),
        });
    }
    Ok(entries)
}

/// The History screen: filtered day groups plus overall statistics. The
/// statistics always cover the full history, independent of the filter.
pub fn fetch_history(
    conn: &Connection,
    filter: &HistoryFilter,
    today: NaiveDate,
) -> Result<HistoryData, DatabaseError> {
    let entries = fetch_entries(conn)?;
    let total_logged = entries.len();
    let all_days = group_by_day(entries.clone());

    let stats = HistoryStats {
        weekly_adherence: weekly_adherence(conn, today)?,
        current_streak: current_streak(&all_days),
        total_logged,
    };

    let days = group_by_day(apply_filter(entries, filter));
    Ok(HistoryData { days, stats })
}
