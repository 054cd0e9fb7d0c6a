//! Pills Rx Core Library
//!
//! Medication schedule construction and adherence tracking.
//!
//! # Architecture
//!
//! ```text
//!   Drug catalog   Prescription   Scheduled doses   Adherence logs
//!        │              │               │                 │
//!        └──────────────┴───────┬───────┴─────────────────┘
//!                               │  FetchCoordinator (scatter/gather, cancellation)
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │   Ordinal Index Assigner │  DrugIndex / SlotIndex
//!                  ├──────────────────────────┤
//!                  │  Composite Key Registry  │  TakeKey / LogKey
//!                  ├──────────────────────────┤
//!                  │     Schedule Builder     │  sparse calendar
//!                  └────────────┬─────────────┘
//!                               │
//!                 ┌─────────────┴─────────────┐
//!                 ▼                           ▼
//!             Rendering               Write-back (LogWrite)
//!                                             │
//!                                  AdherenceStore::put (upsert)
//! ```
//!
//! # Core Principle
//!
//! **The builder is a pure function of its four inputs.** Indices and keys
//! are rebuilt on every build; logs are persisted by natural key only.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Drug, Prescription, ScheduledDose, AdherenceLog)
//! - [`schedule`]: Recurrence, ordinal indices, composite keys, builder
//! - [`fetch`]: Collaborator traits and the fetch coordinator
//! - [`db`]: SQLite store implementing the collaborators
//! - [`config`]: Engine configuration

pub mod config;
pub mod db;
pub mod fetch;
pub mod models;
pub mod schedule;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::{Database, SqliteSources};
pub use fetch::{CancelToken, Collaborators, FetchCoordinator, FetchError};
pub use models::{AdherenceLog, Drug, Prescription, Recurrence, ScheduledDose};
pub use schedule::{
    build_schedule, LogKey, LogWrite, Schedule, ScheduleError, ScheduleSources, TakeKey,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PillsRxError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<db::DbError> for PillsRxError {
    fn from(e: db::DbError) -> Self {
        PillsRxError::DatabaseError(e.to_string())
    }
}

impl From<ScheduleError> for PillsRxError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(_) => PillsRxError::NotFound(e.to_string()),
            ScheduleError::Integrity { .. } => PillsRxError::IntegrityError(e.to_string()),
            ScheduleError::InvalidInput(msg) => PillsRxError::InvalidInput(msg),
            ScheduleError::Collation(msg) => PillsRxError::ConfigError(msg),
        }
    }
}

impl From<FetchError> for PillsRxError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Source(msg) => PillsRxError::DatabaseError(msg),
            FetchError::Cancelled | FetchError::Superseded { .. } => {
                PillsRxError::Cancelled(e.to_string())
            }
            FetchError::Timeout(_) => PillsRxError::Timeout(e.to_string()),
            FetchError::Schedule(inner) => inner.into(),
        }
    }
}

impl From<config::ConfigError> for PillsRxError {
    fn from(e: config::ConfigError) -> Self {
        PillsRxError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for PillsRxError {
    fn from(e: serde_json::Error) -> Self {
        PillsRxError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PillsRxError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PillsRxError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PillsRxCore>, PillsRxError> {
    let db = Database::open(&path)?;
    Ok(PillsRxCore::wrap(db, EngineConfig::default()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PillsRxCore>, PillsRxError> {
    let db = Database::open_in_memory()?;
    Ok(PillsRxCore::wrap(db, EngineConfig::default()))
}

/// Open an engine from a JSON config: its database and its fetch timeout.
#[uniffi::export]
pub fn open_engine(config_json: String) -> Result<Arc<PillsRxCore>, PillsRxError> {
    let config = EngineConfig::from_json_str(&config_json)?;
    let db = config.open_database()?;
    Ok(PillsRxCore::wrap(db, config))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
///
/// Synchronous calls read the store directly. [`load_schedule`](Self::load_schedule)
/// goes through a [`FetchCoordinator`] over the same store, so it honours the
/// configured timeout, [`cancel_loads`](Self::cancel_loads) and supersession.
#[derive(uniffi::Object)]
pub struct PillsRxCore {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
    coordinator: FetchCoordinator,
    cancel: Mutex<CancelToken>,
}

impl PillsRxCore {
    fn wrap(db: Database, config: EngineConfig) -> Arc<Self> {
        let db = Arc::new(Mutex::new(db));
        let sources = Arc::new(SqliteSources::new(db.clone()));
        let coordinator = FetchCoordinator::new(Collaborators::shared(sources), &config);
        Arc::new(Self {
            db,
            config,
            coordinator,
            cancel: Mutex::new(CancelToken::new()),
        })
    }

    /// Shared handle for building a [`SqliteSources`] over the same store.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read_schedule(db: &Database, prescription_id: i64) -> Result<Schedule, PillsRxError> {
        let sources = db.schedule_sources(prescription_id)?;
        Ok(build_schedule(prescription_id, &sources)?)
    }

    async fn load_with(
        &self,
        prescription_id: i64,
        token: &CancelToken,
    ) -> Result<FfiSchedule, PillsRxError> {
        let schedule = self.coordinator.load(prescription_id, token).await?;
        FfiSchedule::try_from(schedule)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl PillsRxCore {
    /// Fetch and build a schedule through the coordinator.
    ///
    /// Fails with `Cancelled` when [`cancel_loads`](Self::cancel_loads) runs
    /// first or a newer load starts, and with `Timeout` past `fetch_timeout_ms`.
    pub async fn load_schedule(&self, prescription_id: i64) -> Result<FfiSchedule, PillsRxError> {
        let token = self.cancel.lock()?.clone();
        self.load_with(prescription_id, &token).await
    }
}

#[uniffi::export]
impl PillsRxCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add or update a catalog entry.
    pub fn upsert_drug(&self, drug: FfiDrug) -> Result<(), PillsRxError> {
        let db = self.db.lock()?;
        db.upsert_drug(&drug.into())?;
        Ok(())
    }

    /// List the drug catalog.
    pub fn list_drugs(&self) -> Result<Vec<FfiDrug>, PillsRxError> {
        let db = self.db.lock()?;
        Ok(db.list_drugs()?.into_iter().map(|d| d.into()).collect())
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    /// Add or update a prescription header.
    pub fn upsert_prescription(&self, prescription: FfiPrescription) -> Result<(), PillsRxError> {
        let prescription = Prescription::try_from(prescription)?;
        let db = self.db.lock()?;
        db.upsert_prescription(&prescription)?;
        Ok(())
    }

    /// Add a scheduled dose, returning its row ID.
    pub fn add_dose(&self, dose: FfiScheduledDose) -> Result<i64, PillsRxError> {
        let dose = ScheduledDose::try_from(dose)?;
        let db = self.db.lock()?;
        Ok(db.insert_dose(&dose)?)
    }

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    /// Cancel every in-flight [`load_schedule`](Self::load_schedule). Later
    /// loads are unaffected.
    pub fn cancel_loads(&self) -> Result<(), PillsRxError> {
        let mut token = self.cancel.lock()?;
        token.cancel();
        *token = CancelToken::new();
        Ok(())
    }

    /// Gather timeout in effect for [`load_schedule`](Self::load_schedule).
    pub fn fetch_timeout_ms(&self) -> u64 {
        self.config.fetch_timeout_ms
    }

    /// Build the schedule of a prescription from the stored records.
    pub fn build_schedule(&self, prescription_id: i64) -> Result<FfiSchedule, PillsRxError> {
        let db = self.db.lock()?;
        let schedule = Self::read_schedule(&db, prescription_id)?;
        FfiSchedule::try_from(schedule)
    }

    /// Build the schedule of a prescription as JSON.
    pub fn schedule_json(&self, prescription_id: i64) -> Result<String, PillsRxError> {
        let db = self.db.lock()?;
        let schedule = Self::read_schedule(&db, prescription_id)?;
        Ok(serde_json::to_string(&schedule)?)
    }

    /// Set the adherence state of the cell addressed by a log key.
    pub fn record_adherence(
        &self,
        prescription_id: i64,
        log_key: u64,
        taken: bool,
    ) -> Result<FfiAdherenceLog, PillsRxError> {
        let db = self.db.lock()?;
        let schedule = Self::read_schedule(&db, prescription_id)?;
        let log = LogWrite::for_key(LogKey(log_key), taken).resolve(&schedule)?;
        db.put_logs(std::slice::from_ref(&log))?;
        Ok(log.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe drug.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrug {
    pub id: i64,
    pub description: String,
}

impl From<Drug> for FfiDrug {
    fn from(drug: Drug) -> Self {
        Self {
            id: drug.id,
            description: drug.description,
        }
    }
}

impl From<FfiDrug> for Drug {
    fn from(drug: FfiDrug) -> Self {
        Drug {
            id: drug.id,
            description: drug.description,
        }
    }
}

/// FFI-safe prescription header. `start_date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: i64,
    pub start_date: String,
    pub duration_days: i64,
}

impl TryFrom<FfiPrescription> for Prescription {
    type Error = PillsRxError;

    fn try_from(p: FfiPrescription) -> Result<Self, Self::Error> {
        let start_date = NaiveDate::parse_from_str(&p.start_date, "%Y-%m-%d")
            .map_err(|e| PillsRxError::InvalidInput(format!("start_date: {}", e)))?;
        Ok(Prescription {
            id: p.id,
            start_date,
            duration_days: p.duration_days,
        })
    }
}

/// FFI-safe scheduled dose. No `recurrence_days` means every day.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduledDose {
    pub prescription_id: i64,
    pub drug_id: i64,
    pub dose: f64,
    pub time_slot: u32,
    pub recurrence_days: Option<Vec<u32>>,
    pub cycle_length: Option<u32>,
}

impl TryFrom<FfiScheduledDose> for ScheduledDose {
    type Error = PillsRxError;

    fn try_from(dose: FfiScheduledDose) -> Result<Self, Self::Error> {
        let recurrence = match (dose.recurrence_days, dose.cycle_length) {
            (Some(days), cycle_length) => Some(Recurrence {
                days: days.into_iter().collect(),
                cycle_length,
            }),
            (None, None) => None,
            (None, Some(len)) => {
                return Err(PillsRxError::InvalidInput(format!(
                    "cycle_length {} given without recurrence_days",
                    len
                )))
            }
        };
        Ok(ScheduledDose {
            prescription_id: dose.prescription_id,
            drug_id: dose.drug_id,
            dose: dose.dose,
            time_slot: dose.time_slot,
            recurrence,
        })
    }
}

/// FFI-safe adherence log.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAdherenceLog {
    pub prescription_id: i64,
    pub drug_id: i64,
    pub time_slot: u32,
    pub day: u32,
    pub taken: bool,
}

impl From<AdherenceLog> for FfiAdherenceLog {
    fn from(log: AdherenceLog) -> Self {
        Self {
            prescription_id: log.prescription_id,
            drug_id: log.drug_id,
            time_slot: log.time_slot,
            day: log.day,
            taken: log.taken,
        }
    }
}

/// FFI-safe drug column.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugColumn {
    pub ordinal: u32,
    pub label: String,
    pub drug_id: i64,
    pub description: String,
}

/// FFI-safe slot header group.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSlotGroup {
    pub time_slot: u32,
    pub label: String,
    pub first_take: u32,
    pub span: u32,
}

/// FFI-safe take column.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTakeColumn {
    pub ordinal: u32,
    pub time_slot: u32,
    pub drug_id: i64,
    pub drug_ordinal: u32,
}

/// FFI-safe cell; only applicable cells are sent.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLogCell {
    pub take_ordinal: u32,
    pub log_key: u64,
    pub dose: f64,
    pub taken: bool,
}

/// FFI-safe calendar day.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDay {
    pub day: u32,
    pub date: String,
    pub cells: Vec<FfiLogCell>,
}

/// FFI-safe schedule.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSchedule {
    pub prescription_id: i64,
    pub start_date: String,
    pub duration_days: u32,
    pub drugs: Vec<FfiDrugColumn>,
    pub slots: Vec<FfiSlotGroup>,
    pub takes: Vec<FfiTakeColumn>,
    pub days: Vec<FfiDay>,
}

/// Narrow an ordinal or span for the FFI records.
fn ffi_u32(value: usize, what: &str) -> Result<u32, PillsRxError> {
    u32::try_from(value)
        .map_err(|_| PillsRxError::InvalidInput(format!("{} {} exceeds u32", what, value)))
}

impl TryFrom<Schedule> for FfiSchedule {
    type Error = PillsRxError;

    fn try_from(schedule: Schedule) -> Result<Self, Self::Error> {
        let drugs = schedule
            .drugs
            .into_iter()
            .map(|d| {
                Ok(FfiDrugColumn {
                    ordinal: ffi_u32(d.ordinal, "drug ordinal")?,
                    label: d.label,
                    drug_id: d.drug_id,
                    description: d.description,
                })
            })
            .collect::<Result<Vec<_>, PillsRxError>>()?;

        let slots = schedule
            .slots
            .into_iter()
            .map(|s| {
                Ok(FfiSlotGroup {
                    time_slot: s.time_slot,
                    label: s.label,
                    first_take: ffi_u32(s.first_take, "take ordinal")?,
                    span: ffi_u32(s.span, "slot span")?,
                })
            })
            .collect::<Result<Vec<_>, PillsRxError>>()?;

        let takes = schedule
            .takes
            .into_iter()
            .map(|t| {
                Ok(FfiTakeColumn {
                    ordinal: ffi_u32(t.ordinal, "take ordinal")?,
                    time_slot: t.time_slot,
                    drug_id: t.drug_id,
                    drug_ordinal: ffi_u32(t.drug_ordinal, "drug ordinal")?,
                })
            })
            .collect::<Result<Vec<_>, PillsRxError>>()?;

        let days = schedule
            .days
            .into_iter()
            .map(|day| {
                let cells = day
                    .applicable()
                    .map(|c| {
                        Ok(FfiLogCell {
                            take_ordinal: ffi_u32(c.take_ordinal, "take ordinal")?,
                            log_key: c.log_key.0,
                            dose: c.dose,
                            taken: c.taken,
                        })
                    })
                    .collect::<Result<Vec<_>, PillsRxError>>()?;
                Ok(FfiDay {
                    day: day.day,
                    date: day.date.to_string(),
                    cells,
                })
            })
            .collect::<Result<Vec<_>, PillsRxError>>()?;

        Ok(Self {
            prescription_id: schedule.prescription_id,
            start_date: schedule.start_date.to_string(),
            duration_days: schedule.duration_days,
            drugs,
            slots,
            takes,
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<PillsRxCore> {
        let core = open_database_in_memory().unwrap();
        core.upsert_drug(FfiDrug {
            id: 10,
            description: "Aspirin".into(),
        })
        .unwrap();
        core.upsert_prescription(FfiPrescription {
            id: 1,
            start_date: "2024-05-01".into(),
            duration_days: 3,
        })
        .unwrap();
        core.add_dose(FfiScheduledDose {
            prescription_id: 1,
            drug_id: 10,
            dose: 1.0,
            time_slot: 480,
            recurrence_days: None,
            cycle_length: None,
        })
        .unwrap();
        core
    }

    #[test]
    fn test_build_schedule_over_ffi() {
        let core = setup();
        let schedule = core.build_schedule(1).unwrap();

        assert_eq!(schedule.days.len(), 3);
        assert_eq!(schedule.days[2].date, "2024-05-03");
        assert_eq!(schedule.drugs[0].label, "A");
        assert_eq!(schedule.slots[0].label, "08:00");
    }

    #[test]
    fn test_record_adherence_round_trip() {
        let core = setup();
        let key = core.build_schedule(1).unwrap().days[1].cells[0].log_key;

        let log = core.record_adherence(1, key, true).unwrap();
        assert_eq!(log.day, 1);
        assert_eq!(log.drug_id, 10);

        let schedule = core.build_schedule(1).unwrap();
        assert!(schedule.days[1].cells[0].taken);
        assert!(!schedule.days[0].cells[0].taken);
    }

    #[test]
    fn test_unknown_prescription_maps_to_not_found() {
        let core = setup();
        assert!(matches!(
            core.build_schedule(9),
            Err(PillsRxError::NotFound(_))
        ));
    }

    #[test]
    fn test_bad_date_is_invalid_input() {
        let core = setup();
        let result = core.upsert_prescription(FfiPrescription {
            id: 2,
            start_date: "05/01/2024".into(),
            duration_days: 3,
        });
        assert!(matches!(result, Err(PillsRxError::InvalidInput(_))));
    }

    #[test]
    fn test_schedule_json_contains_days() {
        let core = setup();
        let json: serde_json::Value =
            serde_json::from_str(&core.schedule_json(1).unwrap()).unwrap();
        assert_eq!(json["days"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_open_engine_uses_config() {
        let core = open_engine(r#"{"fetch_timeout_ms": 500}"#.into()).unwrap();
        assert!(core.list_drugs().unwrap().is_empty());
        assert_eq!(core.fetch_timeout_ms(), 500);
        assert_eq!(
            core.coordinator.timeout(),
            std::time::Duration::from_millis(500)
        );
    }

    #[test]
    fn test_open_engine_rejects_zero_timeout() {
        let result = open_engine(r#"{"fetch_timeout_ms": 0}"#.into());
        assert!(matches!(result, Err(PillsRxError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_load_schedule_through_coordinator() {
        let core = setup();
        let loaded = core.load_schedule(1).await.unwrap();
        let built = core.build_schedule(1).unwrap();

        assert_eq!(loaded.days.len(), built.days.len());
        assert_eq!(loaded.days[1].cells[0].log_key, built.days[1].cells[0].log_key);
        assert_eq!(core.coordinator.generation(), 1);
    }

    #[tokio::test]
    async fn test_load_schedule_unknown_prescription() {
        let core = setup();
        assert!(matches!(
            core.load_schedule(9).await,
            Err(PillsRxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_load_reports_cancelled() {
        let core = setup();
        let token = core.cancel.lock().unwrap().clone();

        core.cancel_loads().unwrap();
        assert!(token.is_cancelled());
        assert!(matches!(
            core.load_with(1, &token).await,
            Err(PillsRxError::Cancelled(_))
        ));

        // A fresh token backs later loads.
        assert!(core.load_schedule(1).await.is_ok());
    }

    #[test]
    fn test_cycle_length_without_days_rejected() {
        let core = setup();
        let result = core.add_dose(FfiScheduledDose {
            prescription_id: 1,
            drug_id: 10,
            dose: 1.0,
            time_slot: 1200,
            recurrence_days: None,
            cycle_length: Some(7),
        });
        assert!(matches!(result, Err(PillsRxError::InvalidInput(_))));

        let dose = ScheduledDose::try_from(FfiScheduledDose {
            prescription_id: 1,
            drug_id: 10,
            dose: 1.0,
            time_slot: 1200,
            recurrence_days: Some(vec![0, 3]),
            cycle_length: Some(7),
        })
        .unwrap();
        assert_eq!(dose.recurrence, Some(Recurrence::cyclic([0, 3], 7)));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_ffi_u32_rejects_wide_values() {
        assert_eq!(ffi_u32(7, "span").unwrap(), 7);
        assert!(matches!(
            ffi_u32(usize::MAX, "take ordinal"),
            Err(PillsRxError::InvalidInput(_))
        ));
    }
}
