//! Scheduled dose models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{DrugId, PrescriptionId};

/// Opaque ordered time of day, minutes since midnight by convention.
pub type TimeSlot = u32;

/// Day subset rule for a scheduled dose.
///
/// A dose with a recurrence applies on `day` when `day % cycle` is one of
/// `days`, where `cycle` is `cycle_length` or, when absent, the prescription
/// duration. Short cycles express alternating and taper regimens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Recurrence {
    /// Residues (day indices within one cycle) on which the dose applies
    pub days: BTreeSet<u32>,
    /// Cycle length in days; defaults to the prescription duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
}

impl Recurrence {
    /// Rule applying on the given residues of the whole course.
    pub fn on_days(days: impl IntoIterator<Item = u32>) -> Self {
        Self {
            days: days.into_iter().collect(),
            cycle_length: None,
        }
    }

    /// Rule applying on the given residues of a repeating cycle.
    pub fn cyclic(days: impl IntoIterator<Item = u32>, cycle_length: u32) -> Self {
        Self {
            days: days.into_iter().collect(),
            cycle_length: Some(cycle_length),
        }
    }
}

/// A dose of one drug at one time slot, recurring per its rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledDose {
    /// Owning prescription
    pub prescription_id: PrescriptionId,
    /// Drug to take
    pub drug_id: DrugId,
    /// Amount per intake, in the drug's own unit
    pub dose: f64,
    /// Time of day
    pub time_slot: TimeSlot,
    /// Day subset rule; `None` means every day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl ScheduledDose {
    /// Create a daily dose.
    pub fn daily(
        prescription_id: PrescriptionId,
        drug_id: DrugId,
        dose: f64,
        time_slot: TimeSlot,
    ) -> Self {
        Self {
            prescription_id,
            drug_id,
            dose,
            time_slot,
            recurrence: None,
        }
    }

    /// Attach a recurrence rule.
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recurrence_omits_absent_cycle() {
        let rule = Recurrence::on_days([0, 2]);
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"days":[0,2]}"#);

        let parsed: Recurrence = serde_json::from_str(r#"{"days":[1],"cycle_length":2}"#).unwrap();
        assert_eq!(parsed, Recurrence::cyclic([1], 2));
    }

    #[test]
    fn test_dose_without_recurrence_deserializes() {
        let dose: ScheduledDose = serde_json::from_str(
            r#"{"prescription_id":1,"drug_id":10,"dose":1.0,"time_slot":480}"#,
        )
        .unwrap();
        assert!(dose.recurrence.is_none());
        assert_eq!(dose.time_slot, 480);
    }
}
