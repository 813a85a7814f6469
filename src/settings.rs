//! Key-value settings. Currently a single knob: the low-stock threshold.

use rusqlite::{params, Connection, OptionalExtension};

use crate::config;
use crate::db::DatabaseError;

const LOW_STOCK_THRESHOLD_KEY: &str = "low_stock_threshold";

/// Pill box cards flag groups whose total stock is at or below this value.
pub fn low_stock_threshold(conn: &Connection) -> Result<i64, DatabaseError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![LOW_STOCK_THRESHOLD_KEY],
            |r| r.get(0),
        )
        .optional()?;

    match stored {
        Some(value) => value.parse().map_err(|_| {
            DatabaseError::ConstraintViolation(format!(
                "stored low_stock_threshold '{value}' is not a number"
            ))
        }),
        None => Ok(config::DEFAULT_LOW_STOCK_THRESHOLD),
    }
}

pub fn set_low_stock_threshold(conn: &Connection, value: i64) -> Result<(), DatabaseError> {
    if value < 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "low_stock_threshold must be non-negative, got {value}"
        )));
    }
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![LOW_STOCK_THRESHOLD_KEY, value.to_string()],
    )?;
    Ok(())
}
