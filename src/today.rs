//! Today screen: the day's expected doses grouped into time-of-day sections,
//! plus intake logging with stock deduction.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{IntakeStatus, TimeFrame};
use crate::models::medication::{DoseConfiguration, IntakeLog};
use crate::models::schedule::Schedule;
use crate::schedule::{bucket_for_time, dose_slots, occurs_on};
use crate::stock::deduct_stock;

/// One dosage choice within an entry. Fixed groups have exactly one;
/// flexible groups list every selected variant.
#[derive(Debug, Clone, Serialize)]
pub struct DoseOption {
    pub dose_configuration_id: Uuid,
    pub medication_id: Uuid,
    pub strength_label: String,
    pub quantity: u32,
}

/// One expected dose slot of a group on the selected day.
#[derive(Debug, Clone, Serialize)]
pub struct TodayEntry {
    pub group_id: Uuid,
    pub group_name: String,
    pub form: String,
    pub frame: TimeFrame,
    pub time: Option<NaiveTime>,
    pub is_flexible: bool,
    pub options: Vec<DoseOption>,
    pub color_background: Option<String>,
    pub status: Option<IntakeStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaySection {
    pub frame: TimeFrame,
    pub label: &'static str,
    pub entries: Vec<TodayEntry>,
    pub taken_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TodayData {
    pub date: NaiveDate,
    pub sections: Vec<TodaySection>,
    pub taken: usize,
    pub total: usize,
    /// `round(taken * 100 / total)`, 0 when nothing is due.
    pub progress: u32,
}

struct ConfigRow {
    id: Uuid,
    group_id: Uuid,
    group_name: String,
    medication_id: Uuid,
    form: String,
    strength: String,
    strength_unit: String,
    color_background: Option<String>,
    schedule: Schedule,
    quantity: u32,
    is_flexible: bool,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| DatabaseError::ConstraintViolation(format!("invalid date '{s}'")))
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| DatabaseError::ConstraintViolation(format!("invalid timestamp '{s}'")))
}

fn load_configurations(conn: &Connection) -> Result<Vec<ConfigRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.group_id, g.name, d.medication_id, m.form,
                m.strength, m.strength_unit, m.color_background,
                d.schedule_type, d.schedule_data, d.quantity, d.is_flexible,
                d.start_date, d.end_date
         FROM dose_configurations d
         JOIN medication_groups g ON g.id = d.group_id
         JOIN medications m ON m.id = d.medication_id
         ORDER BY g.created_at ASC, d.id ASC",
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
                r.get::<_, String>(6)?,
                r.get::<_, Option<String>>(7)?,
                r.get::<_, String>(8)?,
                r.get::<_, Option<String>>(9)?,
                r.get::<_, i64>(10)?,
                r.get::<_, i64>(11)?,
                r.get::<_, String>(12)?,
                r.get::<_, Option<String>>(13)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(raw.len());
    for (
        id,
        group_id,
        group_name,
        medication_id,
        form,
        strength,
        strength_unit,
        color_background,
        schedule_type,
        schedule_data,
        quantity,
        is_flexible,
        start_date,
        end_date,
    ) in raw
    {
        rows.push(ConfigRow {
            id: parse_uuid(&id, "dose_configuration")?,
            group_id: parse_uuid(&group_id, "medication_group")?,
            group_name,
            medication_id: parse_uuid(&medication_id, "medication")?,
            form,
            strength,
            strength_unit,
            color_background,
            schedule: Schedule::from_row(&schedule_type, schedule_data.as_deref())?,
            quantity: quantity.max(0) as u32,
            is_flexible: is_flexible != 0,
            start_date: parse_date(&start_date)?,
            end_date: end_date.as_deref().map(parse_date).transpose()?,
        });
    }
    Ok(rows)
}

fn parse_uuid(s: &str, entity: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|_| DatabaseError::ConstraintViolation(format!(
        "invalid {entity} id '{s}'"
    )))
}

/// Assemble the Today screen for `date`.
pub fn fetch_today(conn: &Connection, date: NaiveDate) -> Result<TodayData, DatabaseError> {
    let configs = load_configurations(conn)?;

    // group configs by group; flexible groups share one schedule across
    // their variant configurations
    let mut group_order: Vec<Uuid> = Vec::new();
    let mut by_group: HashMap<Uuid, Vec<&ConfigRow>> = HashMap::new();
    for config in &configs {
        if !occurs_on(&config.schedule, config.start_date, config.end_date, date) {
            continue;
        }
        if !by_group.contains_key(&config.group_id) {
            group_order.push(config.group_id);
        }
        by_group.entry(config.group_id).or_default().push(config);
    }

    // today's logs per (group, frame), consumed slot by slot
    let mut logs_by_slot = load_day_logs(conn, date, &configs)?;

    let mut entries: Vec<TodayEntry> = Vec::new();
    for group_id in group_order {
        let members = &by_group[&group_id];
        let first = members[0];
        let options: Vec<DoseOption> = members
            .iter()
            .map(|c| DoseOption {
                dose_configuration_id: c.id,
                medication_id: c.medication_id,
                strength_label: format!("{}{}", c.strength, c.strength_unit),
                quantity: c.quantity,
            })
            .collect();

        for slot in dose_slots(&first.schedule) {
            let status = logs_by_slot
                .get_mut(&(group_id, slot.frame))
                .and_then(|queue| queue.pop());
            entries.push(TodayEntry {
                group_id,
                group_name: first.group_name.clone(),
                form: first.form.clone(),
                frame: slot.frame,
                time: slot.time,
                is_flexible: first.is_flexible,
                options: options.clone(),
                color_background: first.color_background.clone(),
                status,
            });
        }
    }

    let mut sections = Vec::new();
    for frame in TimeFrame::ORDERED {
        let frame_entries: Vec<TodayEntry> = entries
            .iter()
            .filter(|e| e.frame == frame)
            .cloned()
            .collect();
        if frame_entries.is_empty() {
            continue;
        }
        let taken_count = frame_entries
            .iter()
            .filter(|e| e.status == Some(IntakeStatus::Taken))
            .count();
        sections.push(TodaySection {
            frame,
            label: frame.label(),
            entries: frame_entries,
            taken_count,
        });
    }

    let total = entries.len();
    let taken = entries
        .iter()
        .filter(|e| e.status == Some(IntakeStatus::Taken))
        .count();
    let progress = if total == 0 {
        0
    } else {
        (taken as f64 * 100.0 / total as f64).round() as u32
    };

    Ok(TodayData {
        date,
        sections,
        taken,
        total,
        progress,
    })
}

type SlotLogs = HashMap<(Uuid, TimeFrame), Vec<IntakeStatus>>;

fn load_day_logs(
    conn: &Connection,
    date: NaiveDate,
    configs: &[ConfigRow],
) -> Result<SlotLogs, DatabaseError> {
    let config_groups: HashMap<Uuid, Uuid> =
        configs.iter().map(|c| (c.id, c.group_id)).collect();

    let mut stmt = conn.prepare(
        "SELECT dose_configuration_id, status, taken_at
         FROM intake_logs
         WHERE date(taken_at) = ?1
         ORDER BY taken_at ASC",
    )?;
    let rows = stmt
        .query_map(params![date.format("%Y-%m-%d").to_string()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut logs: SlotLogs = HashMap::new();
    for (config_id, status, taken_at) in rows {
        let config_id = parse_uuid(&config_id, "dose_configuration")?;
        let Some(group_id) = config_groups.get(&config_id) else {
            continue;
        };
        let status = IntakeStatus::from_str(&status)?;
        let frame = bucket_for_time(parse_datetime(&taken_at)?.time());
        logs.entry((*group_id, frame)).or_default().push(status);
    }
    Ok(logs)
}

/// Input for one logging event.
#[derive(Debug, Clone)]
pub struct LogIntakeInput {
    pub dose_configuration_id: Uuid,
    pub status: IntakeStatus,
    pub taken_at: NaiveDateTime,
}

/// Outcome of a logging event. A stock shortfall is a warning, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct LogOutcome {
    pub log_id: Uuid,
    pub stock_warning: Option<String>,
}

/// Insert an immutable intake log, deducting stock when taken.
///
/// The log date must fall inside the configuration's active range; that is
/// the only occurrence check, so as-needed doses are loggable on any day in
/// range.
pub fn log_intake(conn: &Connection, input: &LogIntakeInput) -> Result<LogOutcome, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT d.group_id, d.medication_id, d.schedule_type, d.schedule_data,
                    d.quantity, d.is_flexible, d.start_date, d.end_date,
                    d.display_name, g.name
             FROM dose_configurations d
             JOIN medication_groups g ON g.id = d.group_id
             WHERE d.id = ?1",
            params![input.dose_configuration_id.to_string()],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, i64>(4)?,
                    r.get::<_, i64>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, Option<String>>(7)?,
                    r.get::<_, Option<String>>(8)?,
                    r.get::<_, String>(9)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "dose_configuration".into(),
            id: input.dose_configuration_id.to_string(),
        })?;

    let group_name = row.9;
    let config = DoseConfiguration {
        id: input.dose_configuration_id,
        group_id: parse_uuid(&row.0, "medication_group")?,
        medication_id: parse_uuid(&row.1, "medication")?,
        schedule: Schedule::from_row(&row.2, row.3.as_deref())?,
        quantity: row.4.max(0) as u32,
        is_flexible: row.5 != 0,
        start_date: parse_date(&row.6)?,
        end_date: row.7.as_deref().map(parse_date).transpose()?,
        display_name: row.8,
    };

    if !config.is_active_on(input.taken_at.date()) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "log date {} is outside the configuration's active range",
            input.taken_at.date()
        )));
    }

    let log = IntakeLog {
        id: Uuid::new_v4(),
        dose_configuration_id: config.id,
        status: input.status,
        taken_at: input.taken_at,
    };
    conn.execute(
        "INSERT INTO intake_logs (id, dose_configuration_id, status, taken_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            log.id.to_string(),
            log.dose_configuration_id.to_string(),
            log.status.as_str(),
            log.taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;

    let stock_warning = if input.status == IntakeStatus::Taken {
        let result = deduct_stock(conn, config.medication_id, i64::from(config.quantity.max(1)))?;
        if result.shortfall > 0 {
            Some(format!(
                "Stock for {group_name} ran short by {}; update your pill box",
                result.shortfall
            ))
        } else {
            None
        }
    } else {
        None
    };

    Ok(LogOutcome {
        log_id: log.id,
        stock_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::stock::{add_stock, total_stock};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        d.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    struct Fixture {
        group_id: Uuid,
        medication_id: Uuid,
        config_id: Uuid,
    }

    fn insert_group(
        conn: &Connection,
        name: &str,
        schedule_type: &str,
        schedule_data: Option<&str>,
        quantity: i64,
        start: &str,
        end: Option<&str>,
    ) -> Fixture {
        let group_id = Uuid::new_v4();
        let medication_id = Uuid::new_v4();
        let config_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO medication_groups (id, name) VALUES (?1, ?2)",
            params![group_id.to_string(), name],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO medications (id, name, form, strength, strength_unit)
             VALUES (?1, ?2, 'Tablet', '10', 'mg')",
            params![medication_id.to_string(), name],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO dose_configurations
                (id, group_id, medication_id, schedule_type, schedule_data,
                 quantity, is_flexible, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
            params![
                config_id.to_string(),
                group_id.to_string(),
                medication_id.to_string(),
                schedule_type,
                schedule_data,
                quantity,
                start,
                end,
            ],
        )
        .unwrap();
        Fixture {
            group_id,
            medication_id,
            config_id,
        }
    }

    const MORNING_EVENING: &str = r#"{"type":"everyday","timeMode":"specific",
        "specificTimes":["08:00","20:00"]}"#;

    #[test]
    fn today_sections_follow_frame_order() {
        let conn = open_memory_database().unwrap();
        insert_group(
            &conn,
            "Sertraline",
            "everyday",
            Some(MORNING_EVENING),
            1,
            "2025-01-01",
            None,
        );

        let data = fetch_today(&conn, date(2025, 5, 12)).unwrap();
        assert_eq!(data.total, 2);
        assert_eq!(data.taken, 0);
        assert_eq!(data.progress, 0);
        assert_eq!(data.sections.len(), 2);
        assert_eq!(data.sections[0].frame, TimeFrame::Morning);
        assert_eq!(data.sections[1].frame, TimeFrame::Evening);
        assert_eq!(data.sections[0].entries[0].time,
            Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
    }

    #[test]
    fn non_occurring_days_are_empty() {
        let conn = open_memory_database().unwrap();
        // Wednesdays only
        insert_group(
            &conn,
            "Methotrexate",
            "specific_days",
            Some(r#"{"type":"specific_days","specificDays":[3],
                     "timeMode":"timeframe","timeFrames":["morning"]}"#),
            1,
            "2025-01-01",
            None,
        );

        // 2025-05-12 is a Monday, 2025-05-14 a Wednesday
        assert_eq!(fetch_today(&conn, date(2025, 5, 12)).unwrap().total, 0);
        assert_eq!(fetch_today(&conn, date(2025, 5, 14)).unwrap().total, 1);
    }

    #[test]
    fn as_needed_never_appears_on_today() {
        let conn = open_memory_database().unwrap();
        insert_group(&conn, "Ibuprofen", "as_needed", None, 1, "2025-01-01", None);
        assert_eq!(fetch_today(&conn, date(2025, 5, 12)).unwrap().total, 0);
    }

    #[test]
    fn logging_marks_entry_and_updates_progress() {
        let conn = open_memory_database().unwrap();
        let fixture = insert_group(
            &conn,
            "Sertraline",
            "everyday",
            Some(MORNING_EVENING),
            1,
            "2025-01-01",
            None,
        );

        let day = date(2025, 5, 12);
        log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(day, 8, 5),
            },
        )
        .unwrap();

        let data = fetch_today(&conn, day).unwrap();
        assert_eq!(data.taken, 1);
        assert_eq!(data.total, 2);
        assert_eq!(data.progress, 50);

        let morning = &data.sections[0];
        assert_eq!(morning.taken_count, 1);
        assert_eq!(morning.entries[0].group_id, fixture.group_id);
        assert_eq!(morning.entries[0].status, Some(IntakeStatus::Taken));
        let evening = &data.sections[1];
        assert_eq!(evening.entries[0].status, None);
    }

    #[test]
    fn taken_log_deducts_stock_and_warns_on_shortfall() {
        let conn = open_memory_database().unwrap();
        let fixture = insert_group(
            &conn,
            "Concerta",
            "everyday",
            Some(MORNING_EVENING),
            2,
            "2025-01-01",
            None,
        );
        add_stock(&conn, fixture.medication_id, 3, None).unwrap();

        let day = date(2025, 5, 12);
        let outcome = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(day, 8, 0),
            },
        )
        .unwrap();
        assert!(outcome.stock_warning.is_none());
        assert_eq!(total_stock(&conn, fixture.medication_id).unwrap(), 1);

        // second dose of 2 against 1 remaining: clamped, warned, never fatal
        let outcome = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(day, 20, 0),
            },
        )
        .unwrap();
        let warning = outcome.stock_warning.unwrap();
        assert!(warning.contains("Concerta"), "warning: {warning}");
        assert_eq!(total_stock(&conn, fixture.medication_id).unwrap(), 0);
    }

    #[test]
    fn skipped_log_leaves_stock_untouched() {
        let conn = open_memory_database().unwrap();
        let fixture = insert_group(
            &conn,
            "Concerta",
            "everyday",
            Some(MORNING_EVENING),
            1,
            "2025-01-01",
            None,
        );
        add_stock(&conn, fixture.medication_id, 10, None).unwrap();

        log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Skipped,
                taken_at: at(date(2025, 5, 12), 8, 0),
            },
        )
        .unwrap();
        assert_eq!(total_stock(&conn, fixture.medication_id).unwrap(), 10);
    }

    #[test]
    fn log_outside_active_range_rejected() {
        let conn = open_memory_database().unwrap();
        let fixture = insert_group(
            &conn,
            "Amoxicillin",
            "everyday",
            Some(MORNING_EVENING),
            1,
            "2025-05-01",
            Some("2025-05-10"),
        );

        let err = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(date(2025, 5, 12), 8, 0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        let err = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(date(2025, 4, 30), 8, 0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn as_needed_loggable_within_range() {
        let conn = open_memory_database().unwrap();
        let fixture = insert_group(&conn, "Ibuprofen", "as_needed", None, 1, "2025-01-01", None);

        let outcome = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: fixture.config_id,
                status: IntakeStatus::Taken,
                taken_at: at(date(2025, 5, 12), 14, 30),
            },
        );
        assert!(outcome.is_ok());
    }

    #[test]
    fn unknown_configuration_not_found() {
        let conn = open_memory_database().unwrap();
        let err = log_intake(
            &conn,
            &LogIntakeInput {
                dose_configuration_id: Uuid::new_v4(),
                status: IntakeStatus::Taken,
                taken_at: at(date(2025, 5, 12), 8, 0),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
