use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // medications, medication_groups, dose_configurations, intake_logs,
        // stock_sources, settings, schema_version
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 7, "Expected 7 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // running migrations again should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn fixed_configuration_requires_positive_quantity() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO medication_groups (id, name) VALUES ('g1', 'Test')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO medications (id, name, form, strength, strength_unit)
             VALUES ('m1', 'Test', 'Tablet', '10', 'mg')",
            [],
        )
        .unwrap();

        // is_flexible = 0 with quantity 0 violates the table CHECK
        let result = conn.execute(
            "INSERT INTO dose_configurations
                (id, group_id, medication_id, schedule_type, quantity, is_flexible, start_date)
             VALUES ('d1', 'g1', 'm1', 'everyday', 0, 0, '2025-01-01')",
            [],
        );
        assert!(result.is_err());

        // flexible configurations may carry quantity 0
        let result = conn.execute(
            "INSERT INTO dose_configurations
                (id, group_id, medication_id, schedule_type, quantity, is_flexible, start_date)
             VALUES ('d2', 'g1', 'm1', 'everyday', 0, 1, '2025-01-01')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn on_disk_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pillbox.db");
        {
            let conn = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO medication_groups (id, name) VALUES ('g1', 'Persisted')",
                [],
            )
            .unwrap();
        }
        let conn = open_database(&path).unwrap();
        let name: String = conn
            .query_row(
                "SELECT name FROM medication_groups WHERE id = 'g1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "Persisted");
    }
}
