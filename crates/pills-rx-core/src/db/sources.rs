//! SQLite-backed implementations of the fetch collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Database, DbError, DbResult};
use crate::fetch::{
    AdherenceStore, DoseSource, DrugCatalog, FetchError, FetchResult, PrescriptionSource,
};
use crate::models::{AdherenceLog, Drug, Prescription, PrescriptionId, ScheduledDose};
use crate::schedule::ScheduleSources;

impl From<DbError> for FetchError {
    fn from(e: DbError) -> Self {
        FetchError::Source(e.to_string())
    }
}

/// Serves all four schedule reads and log writes from one database.
#[derive(Clone)]
pub struct SqliteSources {
    db: Arc<Mutex<Database>>,
}

impl SqliteSources {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Run a query under the connection lock.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> DbResult<T>) -> FetchResult<T> {
        let db = self
            .db
            .lock()
            .map_err(|e| FetchError::Source(format!("Lock poisoned: {}", e)))?;
        Ok(f(&db)?)
    }
}

#[async_trait]
impl DrugCatalog for SqliteSources {
    async fn drugs(&self) -> FetchResult<Vec<Drug>> {
        self.with_db(|db| db.list_drugs())
    }
}

#[async_trait]
impl PrescriptionSource for SqliteSources {
    async fn prescription(&self, id: PrescriptionId) -> FetchResult<Option<Prescription>> {
        self.with_db(|db| db.get_prescription(id))
    }
}

#[async_trait]
impl DoseSource for SqliteSources {
    async fn doses(&self, prescription_id: PrescriptionId) -> FetchResult<Vec<ScheduledDose>> {
        self.with_db(|db| db.list_doses(prescription_id))
    }
}

#[async_trait]
impl AdherenceStore for SqliteSources {
    async fn logs(&self, prescription_id: PrescriptionId) -> FetchResult<Vec<AdherenceLog>> {
        self.with_db(|db| db.list_logs(prescription_id))
    }

    async fn put(&self, logs: &[AdherenceLog]) -> FetchResult<()> {
        self.with_db(|db| db.put_logs(logs))?;
        Ok(())
    }
}

impl Database {
    /// Read the four schedule inputs of a prescription in one go.
    pub fn schedule_sources(
        &self,
        prescription_id: PrescriptionId,
    ) -> DbResult<ScheduleSources> {
        Ok(ScheduleSources {
            prescription: self.get_prescription(prescription_id)?,
            drugs: self.list_drugs()?,
            doses: self.list_doses(prescription_id)?,
            logs: self.list_logs(prescription_id)?,
        })
    }
}
