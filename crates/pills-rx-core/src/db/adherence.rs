//! Adherence log database operations.
//!
//! Records are keyed by `(prescription_id, drug_id, time_slot, day)`. A put
//! always replaces the whole record, so no read precedes a write.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{AdherenceLog, LogNaturalKey, PrescriptionId};

impl Database {
    /// Upsert a batch of logs in one transaction.
    pub fn put_logs(&self, logs: &[AdherenceLog]) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO adherence_logs (prescription_id, drug_id, time_slot, day, taken, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                ON CONFLICT(prescription_id, drug_id, time_slot, day) DO UPDATE SET
                    taken = excluded.taken,
                    updated_at = datetime('now')
                "#,
            )?;
            for log in logs {
                stmt.execute(params![
                    log.prescription_id,
                    log.drug_id,
                    log.time_slot,
                    log.day,
                    log.taken,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(count = logs.len(), "upserted adherence logs");
        Ok(logs.len())
    }

    /// Get one log by natural key.
    pub fn get_log(&self, key: LogNaturalKey) -> DbResult<Option<AdherenceLog>> {
        let (prescription_id, drug_id, time_slot, day) = key;
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT prescription_id, drug_id, time_slot, day, taken
                FROM adherence_logs
                WHERE prescription_id = ?1 AND drug_id = ?2 AND time_slot = ?3 AND day = ?4
                "#,
                params![prescription_id, drug_id, time_slot, day],
                |row| {
                    Ok(AdherenceLog {
                        prescription_id: row.get(0)?,
                        drug_id: row.get(1)?,
                        time_slot: row.get(2)?,
                        day: row.get(3)?,
                        taken: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    /// List the logs of a prescription.
    pub fn list_logs(&self, prescription_id: PrescriptionId) -> DbResult<Vec<AdherenceLog>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT prescription_id, drug_id, time_slot, day, taken
            FROM adherence_logs
            WHERE prescription_id = ?
            ORDER BY day, time_slot, drug_id
            "#,
        )?;

        let rows = stmt.query_map([prescription_id], |row| {
            Ok(AdherenceLog {
                prescription_id: row.get(0)?,
                drug_id: row.get(1)?,
                time_slot: row.get(2)?,
                day: row.get(3)?,
                taken: row.get(4)?,
            })
        })?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}
