//! Drug catalog database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Drug, DrugId};

impl Database {
    /// Insert or update a catalog entry.
    pub fn upsert_drug(&self, drug: &Drug) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO drugs (id, description, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                description = excluded.description,
                updated_at = datetime('now')
            "#,
            params![drug.id, drug.description],
        )?;
        Ok(())
    }

    /// Get a drug by ID.
    pub fn get_drug(&self, id: DrugId) -> DbResult<Option<Drug>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, description FROM drugs WHERE id = ?",
                [id],
                |row| {
                    Ok(Drug {
                        id: row.get(0)?,
                        description: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// List the whole catalog in catalog (ID) order.
    pub fn list_drugs(&self) -> DbResult<Vec<Drug>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, description FROM drugs ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Drug {
                id: row.get(0)?,
                description: row.get(1)?,
            })
        })?;

        let mut drugs = Vec::new();
        for row in rows {
            drugs.push(row?);
        }
        Ok(drugs)
    }
}
