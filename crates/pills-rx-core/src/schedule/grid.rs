//! Render-ready schedule produced by the builder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{LogKey, ScheduleError, ScheduleResult, TakeKey};
use crate::models::{AdherenceLog, DrugId, PrescriptionId, TimeSlot};

/// A drug column in the legend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrugColumn {
    /// Drug ordinal
    pub ordinal: usize,
    /// Spreadsheet-style label ("A", "B", ...)
    pub label: String,
    pub drug_id: DrugId,
    pub description: String,
}

/// One grid column: a drug taken at a time slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TakeColumn {
    /// Take ordinal (column position)
    pub ordinal: usize,
    pub take_key: TakeKey,
    pub slot_ordinal: usize,
    pub drug_ordinal: usize,
    pub time_slot: TimeSlot,
    pub drug_id: DrugId,
}

/// Header group spanning the contiguous take columns of one time slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotGroup {
    pub slot_ordinal: usize,
    pub time_slot: TimeSlot,
    /// Display label ("08:00")
    pub label: String,
    /// Ordinal of the first take column in the group
    pub first_take: usize,
    /// Number of take columns in the group
    pub span: usize,
}

/// Adherence state of one take on one day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LogCell {
    pub take_ordinal: usize,
    /// Key for write-back without a prior read
    pub log_key: LogKey,
    /// Scheduled amount for this intake
    pub dose: f64,
    /// From the matching log, `false` when unlogged
    pub taken: bool,
}

/// A calendar day with at least one applicable take.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Day {
    /// Day index relative to the prescription start
    pub day: u32,
    pub date: NaiveDate,
    /// Dense by take ordinal; `None` where the take does not apply this day
    pub cells: Vec<Option<LogCell>>,
}

impl Day {
    /// Cell of a take, if it applies this day.
    pub fn cell(&self, take_ordinal: usize) -> Option<&LogCell> {
        self.cells.get(take_ordinal).and_then(Option::as_ref)
    }

    /// Applicable cells in take order.
    pub fn applicable(&self) -> impl Iterator<Item = &LogCell> {
        self.cells.iter().flatten()
    }
}

/// Immutable, render-ready schedule of one prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub prescription_id: PrescriptionId,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    /// Drug columns in ordinal order
    pub drugs: Vec<DrugColumn>,
    /// Slot header groups, left to right
    pub slots: Vec<SlotGroup>,
    /// Take columns in canonical (take key) order
    pub takes: Vec<TakeColumn>,
    /// Sparse calendar, ascending by day
    pub days: Vec<Day>,
}

impl Schedule {
    /// `(label, description)` pairs for the drug legend.
    pub fn legend(&self) -> Vec<(&str, &str)> {
        self.drugs
            .iter()
            .map(|d| (d.label.as_str(), d.description.as_str()))
            .collect()
    }

    /// Day record, if the day has any applicable take.
    pub fn day(&self, day: u32) -> Option<&Day> {
        self.days
            .binary_search_by_key(&day, |d| d.day)
            .ok()
            .map(|i| &self.days[i])
    }

    /// Cell of a take on a day.
    pub fn cell(&self, day: u32, take_ordinal: usize) -> Option<&LogCell> {
        self.day(day)?.cell(take_ordinal)
    }

    /// Cell addressed by a log key.
    pub fn cell_by_key(&self, key: LogKey) -> Option<&LogCell> {
        let (take_key, day) = key.decode(self.duration_days)?;
        let ordinal = self.take_ordinal(take_key)?;
        self.cell(day, ordinal)
    }

    /// Take ordinal of a take key.
    pub fn take_ordinal(&self, key: TakeKey) -> Option<usize> {
        self.takes
            .binary_search_by_key(&key, |t| t.take_key)
            .ok()
    }

    /// Build the unlogged record a log key addresses.
    ///
    /// Used when the UI toggles a cell that has no stored log. The result
    /// carries `taken = false` and the natural key of the cell.
    pub fn synthesize_log(&self, key: LogKey) -> ScheduleResult<AdherenceLog> {
        let (take_key, day) = key.decode(self.duration_days).ok_or_else(|| {
            ScheduleError::InvalidInput("schedule has no days to address".into())
        })?;
        let take = self
            .take_ordinal(take_key)
            .map(|ordinal| &self.takes[ordinal])
            .ok_or_else(|| {
                ScheduleError::InvalidInput(format!(
                    "log key {} does not address a scheduled take",
                    key.0
                ))
            })?;

        Ok(AdherenceLog {
            prescription_id: self.prescription_id,
            drug_id: take.drug_id,
            time_slot: take.time_slot,
            day,
            taken: false,
        })
    }
}

/// Minutes in a day.
const MINUTES_PER_DAY: TimeSlot = 24 * 60;

/// `HH:MM` label of a minutes-since-midnight slot.
///
/// Slots outside one day are shown as the raw value.
pub fn slot_label(time: TimeSlot) -> String {
    if time >= MINUTES_PER_DAY {
        return time.to_string();
    }
    format!("{:02}:{:02}", time / 60, time % 60)
}
