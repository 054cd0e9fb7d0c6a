//! Prescription database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Prescription, PrescriptionId};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl Database {
    /// Insert or update a prescription header.
    pub fn upsert_prescription(&self, prescription: &Prescription) -> DbResult<()> {
        if prescription.duration_days < 0 {
            return Err(DbError::Constraint(format!(
                "prescription {} has negative duration {}",
                prescription.id, prescription.duration_days
            )));
        }

        self.conn.execute(
            r#"
            INSERT INTO prescriptions (id, start_date, duration_days, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                start_date = excluded.start_date,
                duration_days = excluded.duration_days,
                updated_at = datetime('now')
            "#,
            params![
                prescription.id,
                prescription.start_date.format(DATE_FORMAT).to_string(),
                prescription.duration_days,
            ],
        )?;
        Ok(())
    }

    /// Get a prescription by ID.
    pub fn get_prescription(&self, id: PrescriptionId) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                "SELECT id, start_date, duration_days FROM prescriptions WHERE id = ?",
                [id],
                |row| {
                    Ok(PrescriptionRow {
                        id: row.get(0)?,
                        start_date: row.get(1)?,
                        duration_days: row.get(2)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all prescriptions by ID.
    pub fn list_prescriptions(&self) -> DbResult<Vec<Prescription>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, start_date, duration_days FROM prescriptions ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(PrescriptionRow {
                id: row.get(0)?,
                start_date: row.get(1)?,
                duration_days: row.get(2)?,
            })
        })?;

        let mut prescriptions = Vec::new();
        for row in rows {
            prescriptions.push(row?.try_into()?);
        }
        Ok(prescriptions)
    }
}

/// Intermediate row struct for database mapping.
struct PrescriptionRow {
    id: PrescriptionId,
    start_date: String,
    duration_days: i64,
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        Ok(Prescription {
            id: row.id,
            start_date: NaiveDate::parse_from_str(&row.start_date, DATE_FORMAT)?,
            duration_days: row.duration_days,
        })
    }
}
