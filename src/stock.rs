//! Stock sources: replenishment batches per medication variant.
//!
//! Batches are decremented oldest-first as doses are logged and clamped at
//! zero; running out is reported as a shortfall, never as a failure.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;

/// Outcome of a deduction. `shortfall` > 0 means the sources could not cover
/// the requested amount and were drained to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deduction {
    pub deducted: i64,
    pub shortfall: i64,
}

/// Record a replenishment batch. Quantity must be positive.
pub fn add_stock(
    conn: &Connection,
    medication_id: Uuid,
    quantity: i64,
    expiry_date: Option<NaiveDate>,
) -> Result<Uuid, DatabaseError> {
    if quantity <= 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "stock quantity must be positive, got {quantity}"
        )));
    }

    let exists: Option<String> = conn
        .query_row(
            "SELECT id FROM medications WHERE id = ?1",
            params![medication_id.to_string()],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: medication_id.to_string(),
        });
    }

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO stock_sources (id, medication_id, quantity, expiry_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            id.to_string(),
            medication_id.to_string(),
            quantity,
            expiry_date.map(|d| d.format("%Y-%m-%d").to_string()),
        ],
    )?;
    Ok(id)
}

/// Remaining stock of one medication variant.
pub fn total_stock(conn: &Connection, medication_id: Uuid) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0) FROM stock_sources WHERE medication_id = ?1",
        params![medication_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(total)
}

/// Remaining stock across all variants of a group.
pub fn group_stock(conn: &Connection, group_id: Uuid) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(s.quantity), 0)
         FROM stock_sources s
         JOIN medications m ON m.id = s.medication_id
         JOIN dose_configurations d ON d.medication_id = m.id
         WHERE d.group_id = ?1",
        params![group_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(total)
}

/// Deduct `amount` from the variant's sources, oldest batch first. Each
/// batch is clamped at zero; whatever cannot be covered is the shortfall.
pub fn deduct_stock(
    conn: &Connection,
    medication_id: Uuid,
    amount: i64,
) -> Result<Deduction, DatabaseError> {
    let mut remaining = amount.max(0);
    let mut deducted = 0;

    let mut stmt = conn.prepare(
        "SELECT id, quantity FROM stock_sources
         WHERE medication_id = ?1 AND quantity > 0
         ORDER BY added_at ASC, id ASC",
    )?;
    let sources = stmt
        .query_map(params![medication_id.to_string()], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (source_id, quantity) in sources {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(quantity);
        conn.execute(
            "UPDATE stock_sources SET quantity = quantity - ?1 WHERE id = ?2",
            params![take, source_id],
        )?;
        deducted += take;
        remaining -= take;
    }

    Ok(Deduction {
        deducted,
        shortfall: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn insert_medication(conn: &Connection) -> Uuid {
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO medications (id, name, form, strength, strength_unit)
             VALUES (?1, 'Test', 'Tablet', '10', 'mg')",
            params![id.to_string()],
        )
        .unwrap();
        id
    }

    #[test]
    fn add_and_total() {
        let conn = open_memory_database().unwrap();
        let med = insert_medication(&conn);

        assert_eq!(total_stock(&conn, med).unwrap(), 0);
        add_stock(&conn, med, 30, None).unwrap();
        add_stock(&conn, med, 20, NaiveDate::from_ymd_opt(2026, 1, 1)).unwrap();
        assert_eq!(total_stock(&conn, med).unwrap(), 50);
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let conn = open_memory_database().unwrap();
        let med = insert_medication(&conn);
        assert!(add_stock(&conn, med, 0, None).is_err());
        assert!(add_stock(&conn, med, -5, None).is_err());
    }

    #[test]
    fn add_rejects_unknown_medication() {
        let conn = open_memory_database().unwrap();
        let err = add_stock(&conn, Uuid::new_v4(), 10, None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn deduction_is_fifo_by_added_at() {
        let conn = open_memory_database().unwrap();
        let med = insert_medication(&conn);

        // two batches with distinct timestamps, oldest first
        conn.execute(
            "INSERT INTO stock_sources (id, medication_id, quantity, added_at)
             VALUES ('old', ?1, 10, '2025-01-01 08:00:00')",
            params![med.to_string()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO stock_sources (id, medication_id, quantity, added_at)
             VALUES ('new', ?1, 10, '2025-02-01 08:00:00')",
            params![med.to_string()],
        )
        .unwrap();

        let result = deduct_stock(&conn, med, 12).unwrap();
        assert_eq!(result.deducted, 12);
        assert_eq!(result.shortfall, 0);

        let old: i64 = conn
            .query_row("SELECT quantity FROM stock_sources WHERE id = 'old'", [], |r| {
                r.get(0)
            })
            .unwrap();
        let new: i64 = conn
            .query_row("SELECT quantity FROM stock_sources WHERE id = 'new'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(old, 0);
        assert_eq!(new, 8);
    }

    #[test]
    fn deduction_clamps_at_zero_and_reports_shortfall() {
        let conn = open_memory_database().unwrap();
        let med = insert_medication(&conn);
        add_stock(&conn, med, 3, None).unwrap();

        let result = deduct_stock(&conn, med, 5).unwrap();
        assert_eq!(result.deducted, 3);
        assert_eq!(result.shortfall, 2);
        assert_eq!(total_stock(&conn, med).unwrap(), 0);

        // empty sources deduct nothing
        let result = deduct_stock(&conn, med, 1).unwrap();
        assert_eq!(result.deducted, 0);
        assert_eq!(result.shortfall, 1);
    }
}
