//! Scheduled dose database operations.

use rusqlite::params;

use super::{Database, DbError, DbResult};
use crate::models::{DrugId, PrescriptionId, ScheduledDose, TimeSlot};

impl Database {
    /// Insert a scheduled dose, returning its row ID.
    pub fn insert_dose(&self, dose: &ScheduledDose) -> DbResult<i64> {
        let recurrence_json = dose
            .recurrence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO scheduled_doses (prescription_id, drug_id, dose, time_slot, recurrence)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                dose.prescription_id,
                dose.drug_id,
                dose.dose,
                dose.time_slot,
                recurrence_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List the doses of a prescription in insertion order.
    pub fn list_doses(&self, prescription_id: PrescriptionId) -> DbResult<Vec<ScheduledDose>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT prescription_id, drug_id, dose, time_slot, recurrence
            FROM scheduled_doses
            WHERE prescription_id = ?
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([prescription_id], |row| {
            Ok(DoseRow {
                prescription_id: row.get(0)?,
                drug_id: row.get(1)?,
                dose: row.get(2)?,
                time_slot: row.get(3)?,
                recurrence: row.get(4)?,
            })
        })?;

        let mut doses = Vec::new();
        for row in rows {
            doses.push(row?.try_into()?);
        }
        Ok(doses)
    }
}

/// Intermediate row struct for database mapping.
struct DoseRow {
    prescription_id: PrescriptionId,
    drug_id: DrugId,
    dose: f64,
    time_slot: TimeSlot,
    recurrence: Option<String>,
}

impl TryFrom<DoseRow> for ScheduledDose {
    type Error = DbError;

    fn try_from(row: DoseRow) -> Result<Self, Self::Error> {
        Ok(ScheduledDose {
            prescription_id: row.prescription_id,
            drug_id: row.drug_id,
            dose: row.dose,
            time_slot: row.time_slot,
            recurrence: row
                .recurrence
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
        })
    }
}
