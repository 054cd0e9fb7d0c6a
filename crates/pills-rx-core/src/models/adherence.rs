//! Adherence log models.

use serde::{Deserialize, Serialize};

use super::{DrugId, PrescriptionId, TimeSlot};

/// Natural key of an adherence record: `(prescription, drug, slot, day)`.
pub type LogNaturalKey = (PrescriptionId, DrugId, TimeSlot, u32);

/// Whether one scheduled intake was taken on one day.
///
/// Logs are sparse. A missing record means "not yet logged" and reads as
/// `taken = false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdherenceLog {
    pub prescription_id: PrescriptionId,
    pub drug_id: DrugId,
    pub time_slot: TimeSlot,
    /// Day index relative to the prescription start
    pub day: u32,
    pub taken: bool,
}

impl AdherenceLog {
    /// Storage key of this record.
    pub fn natural_key(&self) -> LogNaturalKey {
        (self.prescription_id, self.drug_id, self.time_slot, self.day)
    }
}
