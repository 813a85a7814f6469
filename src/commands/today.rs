use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tauri::State;
use uuid::Uuid;

use crate::models::enums::IntakeStatus;
use crate::today::{fetch_today, LogIntakeInput, LogOutcome, TodayData};

use super::state::AppState;

#[tauri::command]
pub fn get_today(state: State<AppState>, date: Option<String>) -> Result<TodayData, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let date = match date {
        Some(s) => {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| format!("Invalid date: {s}"))?
        }
        None => Local::now().date_naive(),
    };
    fetch_today(&conn, date).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn log_intake(
    state: State<AppState>,
    dose_configuration_id: String,
    status: String,
    taken_at: Option<String>,
) -> Result<LogOutcome, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let input = LogIntakeInput {
        dose_configuration_id: Uuid::parse_str(&dose_configuration_id)
            .map_err(|_| format!("Invalid id: {dose_configuration_id}"))?,
        status: IntakeStatus::from_str(&status).map_err(|e| e.to_string())?,
        taken_at: match taken_at {
            Some(s) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                .map_err(|_| format!("Invalid timestamp: {s}"))?,
            None => Local::now().naive_local(),
        },
    };
    let outcome = crate::today::log_intake(&conn, &input).map_err(|e| e.to_string())?;
    tracing::info!(
        "Logged {} for configuration {}",
        input.status.as_str(),
        input.dose_configuration_id
    );
    Ok(outcome)
}
