//! SQLite schema definition.

/// Complete database schema for pills-rx.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Drug Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS drugs (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Prescriptions
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    id INTEGER PRIMARY KEY,
    start_date TEXT NOT NULL,                    -- YYYY-MM-DD
    duration_days INTEGER NOT NULL CHECK (duration_days >= 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Scheduled Doses
-- ============================================================================

-- drug_id is not a foreign key: the catalog is synced independently and
-- dangling references surface as integrity errors at build time.
CREATE TABLE IF NOT EXISTS scheduled_doses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prescription_id INTEGER NOT NULL REFERENCES prescriptions(id),
    drug_id INTEGER NOT NULL,
    dose REAL NOT NULL,
    time_slot INTEGER NOT NULL CHECK (time_slot >= 0),
    recurrence TEXT,                             -- JSON {days, cycle_length?}
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_doses_prescription ON scheduled_doses(prescription_id);

-- ============================================================================
-- Adherence Logs (keyed by natural key, last write wins)
-- ============================================================================

CREATE TABLE IF NOT EXISTS adherence_logs (
    prescription_id INTEGER NOT NULL,
    drug_id INTEGER NOT NULL,
    time_slot INTEGER NOT NULL,
    day INTEGER NOT NULL CHECK (day >= 0),
    taken INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (prescription_id, drug_id, time_slot, day)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO prescriptions (id, start_date, duration_days) VALUES (1, '2024-01-01', -3)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dose_requires_prescription() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO scheduled_doses (prescription_id, drug_id, dose, time_slot) VALUES (42, 10, 1.0, 480)",
            [],
        );
        assert!(result.is_err());
    }
}
