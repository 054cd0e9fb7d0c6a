//! Schedule construction and adherence indexing.
//!
//! Pipeline: Ordinal Index Assigner → Composite Key Registry → Builder
//!
//! ```text
//!  drugs  doses  ──► DrugIndex / SlotIndex ──► TakeRegistry ──┐
//!                                                              ├──► Schedule
//!  prescription  logs  ───────────────────────────────────────┘
//! ```
//!
//! Everything here is pure and synchronous. Indices and keys are rebuilt on
//! every call to [`build_schedule`] and live only as long as the returned
//! [`Schedule`].

mod builder;
mod grid;
mod keys;
mod ordinal;
mod recurrence;
mod writeback;

pub use builder::*;
pub use grid::*;
pub use keys::*;
pub use ordinal::*;
pub use recurrence::*;
pub use writeback::*;

use thiserror::Error;

use crate::models::{DrugId, PrescriptionId};

/// Schedule construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Prescription not found: {0}")]
    NotFound(PrescriptionId),

    #[error("Integrity error: dose references drug {drug_id} missing from catalog")]
    Integrity { drug_id: DrugId },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Collation unavailable: {0}")]
    Collation(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
