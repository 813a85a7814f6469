//! Pill box screen: inventory cards per medication group and the per-group
//! detail view.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{IntakeStatus, SelectionRule, TimeFrame};
use crate::models::medication::{Medication, MedicationGroup, StockSource};
use crate::models::schedule::Schedule;
use crate::schedule::{describe, dose_slots, occurs_on};

#[derive(Debug, Clone, Serialize)]
pub struct GroupCard {
    pub group_id: Uuid,
    pub name: String,
    /// Formatted strengths of the group's variants, e.g. ["18mg", "36mg"].
    pub strengths: Vec<String>,
    pub form: String,
    pub total_stock: i64,
    pub has_low_stock: bool,
    pub color_background: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantDetail {
    pub medication_id: Uuid,
    pub strength_label: String,
    pub shape: Option<String>,
    pub shape_line: bool,
    pub color_left: Option<String>,
    pub color_right: Option<String>,
    pub quantity: u32,
    pub is_flexible: bool,
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdherenceSummary {
    pub taken: usize,
    pub scheduled: usize,
    /// Rounded percent, capped at 100.
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentLog {
    pub id: Uuid,
    pub status: IntakeStatus,
    pub taken_at: NaiveDateTime,
    pub strength_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MedicationDetailData {
    pub card: GroupCard,
    pub selection_rule: SelectionRule,
    pub variants: Vec<VariantDetail>,
    pub schedule_summary: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub stock_sources: Vec<StockSource>,
    pub adherence: AdherenceSummary,
    pub recent_logs: Vec<RecentLog>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PillBoxData {
    pub cards: Vec<GroupCard>,
    pub low_stock_threshold: i64,
}

fn parse_uuid(s: &str, entity: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|_| {
        DatabaseError::ConstraintViolation(format!("invalid {entity} id '{s}'"))
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| DatabaseError::ConstraintViolation(format!("invalid date '{s}'")))
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|_| DatabaseError::ConstraintViolation(format!("invalid timestamp '{s}'")))
}

struct MemberRow {
    medication: Medication,
    quantity: u32,
    is_flexible: bool,
    schedule_type: String,
    schedule_data: Option<String>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    config_id: Uuid,
}

fn load_members(conn: &Connection, group_id: Uuid) -> Result<Vec<MemberRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.form, m.custom_form_name, m.strength, m.strength_unit,
                m.shape, m.shape_line, m.color_left, m.color_right, m.color_background,
                d.quantity, d.is_flexible, d.schedule_type, d.schedule_data,
                d.start_date, d.end_date, d.id
         FROM dose_configurations d
         JOIN medications m ON m.id = d.medication_id
         WHERE d.group_id = ?1
         ORDER BY m.created_at ASC, m.id ASC",
    )?;
    let raw = stmt
        .query_map(params![group_id.to_string()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, Option<String>>(6)?,
                r.get::<_, i64>(7)?,
                r.get::<_, Option<String>>(8)?,
                r.get::<_, Option<String>>(9)?,
                r.get::<_, Option<String>>(10)?,
                r.get::<_, i64>(11)?,
                r.get::<_, i64>(12)?,
                r.get::<_, String>(13)?,
                r.get::<_, Option<String>>(14)?,
                r.get::<_, String>(15)?,
                r.get::<_, Option<String>>(16)?,
                r.get::<_, String>(17)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut members = Vec::with_capacity(raw.len());
    for row in raw {
        members.push(MemberRow {
            medication: Medication {
                id: parse_uuid(&row.0, "medication")?,
                name: row.1,
                form: row.2,
                custom_form_name: row.3,
                strength: row.4,
                strength_unit: row.5,
                shape: row.6,
                shape_line: row.7 != 0,
                color_left: row.8,
                color_right: row.9,
                color_background: row.10,
            },
            quantity: row.11.max(0) as u32,
            is_flexible: row.12 != 0,
            schedule_type: row.13,
            schedule_data: row.14,
            start_date: parse_date(&row.15)?,
            end_date: row.16.as_deref().map(parse_date).transpose()?,
            config_id: parse_uuid(&row.17, "dose_configuration")?,
        });
    }
    Ok(members)
}

fn card_for_group(
    conn: &Connection,
    group_id: Uuid,
    name: &str,
    threshold: i64,
) -> Result<GroupCard, DatabaseError> {
    let members = load_members(conn, group_id)?;
    let total_stock = crate::stock::group_stock(conn, group_id)?;
    let form = members
        .first()
        .map(|m| m.medication.display_form().to_string())
        .unwrap_or_default();
    let color_background = members
        .first()
        .and_then(|m| m.medication.color_background.clone());
    Ok(GroupCard {
        group_id,
        name: name.to_string(),
        strengths: members.iter().map(|m| m.medication.strength_label()).collect(),
        form,
        total_stock,
        has_low_stock: total_stock <= threshold,
        color_background,
    })
}

/// All group cards, ordered by creation.
pub fn fetch_group_cards(conn: &Connection, threshold: i64) -> Result<PillBoxData, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id, name FROM medication_groups ORDER BY created_at ASC, id ASC")?;
    let groups = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut cards = Vec::with_capacity(groups.len());
    for (id, name) in groups {
        let group_id = parse_uuid(&id, "medication_group")?;
        cards.push(card_for_group(conn, group_id, &name, threshold)?);
    }
    Ok(PillBoxData {
        cards,
        low_stock_threshold: threshold,
    })
}

/// Full detail view for one group.
pub fn fetch_group_detail(
    conn: &Connection,
    group_id: Uuid,
    threshold: i64,
    today: NaiveDate,
) -> Result<MedicationDetailData, DatabaseError> {
    let group = load_group(conn, group_id)?;

    let members = load_members(conn, group_id)?;
    let card = card_for_group(conn, group_id, &group.name, threshold)?;

    let mut variants = Vec::with_capacity(members.len());
    for member in &members {
        variants.push(VariantDetail {
            medication_id: member.medication.id,
            strength_label: member.medication.strength_label(),
            shape: member.medication.shape.clone(),
            shape_line: member.medication.shape_line,
            color_left: member.medication.color_left.clone(),
            color_right: member.medication.color_right.clone(),
            quantity: member.quantity,
            is_flexible: member.is_flexible,
            stock: crate::stock::total_stock(conn, member.medication.id)?,
        });
    }

    // the variants of a group share one schedule and date range
    let (schedule, schedule_summary, start_date, end_date) = match members.first() {
        Some(first) => {
            let schedule = Schedule::from_row(&first.schedule_type, first.schedule_data.as_deref())?;
            let summary = describe(&schedule);
            (Some(schedule), summary, first.start_date, first.end_date)
        }
        None => (None, String::new(), today, None),
    };

    let stock_sources = load_stock_sources(conn, group_id)?;
    let adherence = weekly_group_adherence(conn, &members, schedule.as_ref(), today)?;
    let recent_logs = load_recent_logs(conn, group_id, 5)?;

    Ok(MedicationDetailData {
        card,
        selection_rule: group.selection_rule,
        variants,
        schedule_summary,
        start_date,
        end_date,
        stock_sources,
        adherence,
        recent_logs,
    })
}

fn load_group(conn: &Connection, group_id: Uuid) -> Result<MedicationGroup, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT name, selection_rule, reminder_time, time_frame
             FROM medication_groups WHERE id = ?1",
            params![group_id.to_string()],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "medication_group".into(),
            id: group_id.to_string(),
        })?;

    let (name, selection_rule, reminder_time, time_frame) = row;
    Ok(MedicationGroup {
        id: group_id,
        name,
        selection_rule: SelectionRule::from_str(&selection_rule)?,
        reminder_time: reminder_time
            .as_deref()
            .map(|s| {
                NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| {
                    DatabaseError::ConstraintViolation(format!("invalid reminder time '{s}'"))
                })
            })
            .transpose()?,
        time_frame: time_frame.as_deref().map(TimeFrame::from_str).transpose()?,
    })
}

fn load_stock_sources(
    conn: &Connection,
    group_id: Uuid,
) -> Result<Vec<StockSource>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.medication_id, s.quantity, s.expiry_date, s.added_at
         FROM stock_sources s
         JOIN dose_configurations d ON d.medication_id = s.medication_id
         WHERE d.group_id = ?1
         ORDER BY s.added_at ASC, s.id ASC",
    )?;
    let raw = stmt
        .query_map(params![group_id.to_string()], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut sources = Vec::with_capacity(raw.len());
    for (id, medication_id, quantity, expiry_date, added_at) in raw {
        sources.push(StockSource {
            id: parse_uuid(&id, "stock_source")?,
            medication_id: parse_uuid(&medication_id, "medication")?,
            quantity,
            expiry_date: expiry_date.as_deref().map(parse_date).transpose()?,
            added_at: parse_datetime(&added_at)?,
        });
    }
    Ok(sources)
}

/// Taken doses against scheduled dose slots over the trailing 7 days.
fn weekly_group_adherence(
    conn: &Connection,
    members: &[MemberRow],
    schedule: Option<&Schedule>,
    today: NaiveDate,
) -> Result<AdherenceSummary, DatabaseError> {
    let window_start = today - Days::new(6);

    let scheduled = match schedule {
        Some(schedule) => {
            let first = &members[0];
            let per_day = dose_slots(schedule).len();
            window_start
                .iter_days()
                .take(7)
                .filter(|day| occurs_on(schedule, first.start_date, first.end_date, *day))
                .count()
                * per_day
        }
        None => 0,
    };

    let mut taken = 0usize;
    if !members.is_empty() {
        let config_ids: Vec<String> = members.iter().map(|m| m.config_id.to_string()).collect();
        let placeholders = vec!["?"; config_ids.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM intake_logs
             WHERE status = 'taken'
               AND date(taken_at) BETWEEN ? AND ?
               AND dose_configuration_id IN ({placeholders})"
        );
        let start = window_start.format("%Y-%m-%d").to_string();
        let end = today.format("%Y-%m-%d").to_string();
        let mut params_vec: Vec<&dyn rusqlite::ToSql> = vec![&start, &end];
        params_vec.extend(config_ids.iter().map(|id| id as &dyn rusqlite::ToSql));
        taken = conn.query_row(&sql, params_vec.as_slice(), |r| r.get::<_, i64>(0))? as usize;
    }

    let percent = if scheduled == 0 {
        0
    } else {
        ((taken as f64 * 100.0 / scheduled as f64).round() as u32).min(100)
    };
    Ok(AdherenceSummary {
        taken,
        scheduled,
        percent,
    })
}

fn load_recent_logs(
    conn: &Connection,
    group_id: Uuid,
    limit: usize,
) -> Result<Vec<RecentLog>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.status, l.taken_at, m.strength, m.strength_unit
         FROM intake_logs l
         JOIN dose_configurations d ON d.id = l.dose_configuration_id
         JOIN medications m ON m.id = d.medication_id
         WHERE d.group_id = ?1
         ORDER BY l.taken_at DESC
         LIMIT ?2",
    )?;
    let raw = stmt
        .query_map(params![group_id.to_string(), limit as i64], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut logs = Vec::with_capacity(raw.len());
    for (id, status, taken_at, strength, unit) in raw {
        logs.push(RecentLog {
            id: parse_uuid(&id, "intake_log")?,
            status: IntakeStatus::from_str(&status)?,
            taken_at: parse_datetime(&taken_at)?,
            strength_label: format!("{strength}{unit}"),
        });
    }
    Ok(logs)
}
