//! Fetch coordination: scatter/gather of the four schedule inputs.
//!
//! Collaborators are passed in explicitly as trait objects; the builder
//! itself never performs I/O.

mod cancel;
mod coordinator;

pub use cancel::*;
pub use coordinator::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AdherenceLog, Drug, Prescription, PrescriptionId, ScheduledDose};
use crate::schedule::ScheduleError;

/// Fetch errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Fetch generation {generation} superseded by {current}")]
    Superseded { generation: u64, current: u64 },

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Drug catalog read.
#[async_trait]
pub trait DrugCatalog: Send + Sync {
    async fn drugs(&self) -> FetchResult<Vec<Drug>>;
}

/// Prescription header read; `None` signals not found.
#[async_trait]
pub trait PrescriptionSource: Send + Sync {
    async fn prescription(&self, id: PrescriptionId) -> FetchResult<Option<Prescription>>;
}

/// Scheduled dose read.
#[async_trait]
pub trait DoseSource: Send + Sync {
    async fn doses(&self, prescription_id: PrescriptionId) -> FetchResult<Vec<ScheduledDose>>;
}

/// Adherence log store.
#[async_trait]
pub trait AdherenceStore: Send + Sync {
    async fn logs(&self, prescription_id: PrescriptionId) -> FetchResult<Vec<AdherenceLog>>;

    /// Upsert complete records by natural key.
    async fn put(&self, logs: &[AdherenceLog]) -> FetchResult<()>;
}

/// The four collaborators a coordinator reads from.
#[derive(Clone)]
pub struct Collaborators {
    pub drugs: Arc<dyn DrugCatalog>,
    pub prescriptions: Arc<dyn PrescriptionSource>,
    pub doses: Arc<dyn DoseSource>,
    pub logs: Arc<dyn AdherenceStore>,
}

impl Collaborators {
    /// Use one backend for all four reads.
    pub fn shared<S>(source: Arc<S>) -> Self
    where
        S: DrugCatalog + PrescriptionSource + DoseSource + AdherenceStore + 'static,
    {
        Self {
            drugs: source.clone(),
            prescriptions: source.clone(),
            doses: source.clone(),
            logs: source,
        }
    }
}
