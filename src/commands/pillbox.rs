use chrono::{Local, NaiveDate};
use tauri::State;
use uuid::Uuid;

use crate::pillbox::{fetch_group_cards, fetch_group_detail, MedicationDetailData, PillBoxData};
use crate::settings::low_stock_threshold;
use crate::wizard::form::MedicationFormData;
use crate::wizard::persist_form;

use super::state::AppState;

fn parse_id(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s).map_err(|_| format!("Invalid id: {s}"))
}

#[tauri::command]
pub fn save_medication(state: State<AppState>, form: MedicationFormData) -> Result<String, String> {
    let mut conn = state.connect().map_err(|e| e.to_string())?;
    let group_id = persist_form(&mut conn, &form).map_err(|e| e.to_string())?;
    tracing::info!("Saved medication group {group_id}");
    Ok(group_id.to_string())
}

#[tauri::command]
pub fn get_pill_box(state: State<AppState>) -> Result<PillBoxData, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let threshold = low_stock_threshold(&conn).map_err(|e| e.to_string())?;
    fetch_group_cards(&conn, threshold).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_medication_detail(
    state: State<AppState>,
    group_id: String,
) -> Result<MedicationDetailData, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let threshold = low_stock_threshold(&conn).map_err(|e| e.to_string())?;
    let today = Local::now().date_naive();
    fetch_group_detail(&conn, parse_id(&group_id)?, threshold, today)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn add_stock(
    state: State<AppState>,
    medication_id: String,
    quantity: i64,
    expiry_date: Option<String>,
) -> Result<String, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let expiry = expiry_date
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| format!("Invalid date: {s}"))
        })
        .transpose()?;
    let medication_id = parse_id(&medication_id)?;
    let source_id = crate::stock::add_stock(&conn, medication_id, quantity, expiry)
        .map_err(|e| e.to_string())?;
    tracing::info!("Added stock of {quantity} to medication {medication_id}");
    Ok(source_id.to_string())
}
