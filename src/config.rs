use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Pillbox";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fallback low-stock threshold (units remaining) when the user has not
/// configured one in settings.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,pillbox_lib=debug"
}

/// Get the application data directory
/// ~/Pillbox/ on all platforms, kept user-visible
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Pillbox")
}

/// Path to the single-user application database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("pillbox.db")
}
