use chrono::Local;
use tauri::State;

use crate::history::{fetch_history, HistoryData, HistoryFilter};

use super::state::AppState;

#[tauri::command]
pub fn get_history(
    state: State<AppState>,
    filter: Option<HistoryFilter>,
) -> Result<HistoryData, String> {
    let conn = state.connect().map_err(|e| e.to_string())?;
    let filter = filter.unwrap_or_default();
    fetch_history(&conn, &filter, Local::now().date_naive()).map_err(|e| e.to_string())
}
