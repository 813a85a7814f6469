pub mod commands;
pub mod config;
pub mod db;
pub mod history;
pub mod models;
pub mod pillbox;
pub mod schedule;
pub mod settings;
pub mod stock;
pub mod today;
pub mod wizard;

use commands::AppState;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Starting {} {}", config::APP_NAME, config::APP_VERSION);

    tauri::Builder::default()
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![
            commands::state::health_check,
            commands::pillbox::save_medication,
            commands::pillbox::get_pill_box,
            commands::pillbox::get_medication_detail,
            commands::pillbox::add_stock,
            commands::today::get_today,
            commands::today::log_intake,
            commands::history::get_history,
            commands::settings::get_settings,
            commands::settings::set_low_stock_threshold,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
