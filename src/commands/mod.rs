//! Tauri command handlers. Each command opens its own connection, delegates
//! to the domain modules, and maps errors to strings for the frontend.

pub mod history;
pub mod pillbox;
pub mod settings;
pub mod state;
pub mod today;

pub use state::AppState;
