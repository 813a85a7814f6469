use serde::Serialize;
use tauri::State;

use super::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub low_stock_threshold: i64,
}

#[tauri::command]
pub fn get_settings(state: State<AppState>) -> Result<SettingsView, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let low_stock_threshold =
        crate::settings::low_stock_threshold(&conn).map_err(|e| e.to_string())?;
    Ok(SettingsView {
        low_stock_threshold,
    })
}

#[tauri::command]
pub fn set_low_stock_threshold(state: State<AppState>, value: i64) -> Result<(), String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    crate::settings::set_low_stock_threshold(&conn, value).map_err(|e| e.to_string())?;
    tracing::info!("Low stock threshold set to {value}");
    Ok(())
}
