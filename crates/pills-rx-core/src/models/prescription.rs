//! Prescription header models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a prescription.
pub type PrescriptionId = i64;

/// A course of dosing over a fixed number of days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prescription {
    /// Prescription identifier
    pub id: PrescriptionId,
    /// Calendar date of day 0
    pub start_date: NaiveDate,
    /// Length of the course in days (must not be negative)
    pub duration_days: i64,
}

impl Prescription {
    /// Create a new prescription header.
    pub fn new(id: PrescriptionId, start_date: NaiveDate, duration_days: i64) -> Self {
        Self {
            id,
            start_date,
            duration_days,
        }
    }
}
