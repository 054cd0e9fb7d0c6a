//! Adherence write-back requests.
//!
//! A write always carries a complete replacement record, so the store only
//! needs an unconditional upsert by natural key. Updating an existing log and
//! inserting a synthesized one are the same operation.

use serde::{Deserialize, Serialize};

use super::{LogKey, Schedule, ScheduleError, ScheduleResult};
use crate::models::AdherenceLog;

/// The cell a write addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    /// A cell key taken from the schedule
    Key(LogKey),
    /// An already materialized record
    Record(AdherenceLog),
}

/// Request to set the adherence state of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogWrite {
    pub target: LogTarget,
    pub taken: bool,
}

impl LogWrite {
    /// Write addressed by log key.
    pub fn for_key(log_key: LogKey, taken: bool) -> Self {
        Self {
            target: LogTarget::Key(log_key),
            taken,
        }
    }

    /// Write addressed by an existing record.
    pub fn for_record(log: AdherenceLog, taken: bool) -> Self {
        Self {
            target: LogTarget::Record(log),
            taken,
        }
    }

    /// Produce the full record to upsert.
    pub fn resolve(&self, schedule: &Schedule) -> ScheduleResult<AdherenceLog> {
        match &self.target {
            LogTarget::Key(key) => {
                let mut log = schedule.synthesize_log(*key)?;
                log.taken = self.taken;
                Ok(log)
            }
            LogTarget::Record(log) => {
                if log.prescription_id != schedule.prescription_id {
                    return Err(ScheduleError::InvalidInput(format!(
                        "log belongs to prescription {}, schedule is {}",
                        log.prescription_id, schedule.prescription_id
                    )));
                }
                Ok(AdherenceLog {
                    taken: self.taken,
                    ..log.clone()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Drug, Prescription, ScheduledDose};
    use crate::schedule::{build_schedule, ScheduleSources};
    use chrono::NaiveDate;

    fn schedule() -> Schedule {
        let sources = ScheduleSources {
            prescription: Some(Prescription::new(
                5,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                3,
            )),
            drugs: vec![Drug::new(10, "Aspirin")],
            doses: vec![ScheduledDose::daily(5, 10, 1.0, 480)],
            logs: vec![],
        };
        build_schedule(5, &sources).unwrap()
    }

    #[test]
    fn test_key_write_synthesizes_full_record() {
        let schedule = schedule();
        let key = schedule.cell(2, 0).unwrap().log_key;

        let log = LogWrite::for_key(key, true).resolve(&schedule).unwrap();
        assert_eq!(
            log,
            AdherenceLog {
                prescription_id: 5,
                drug_id: 10,
                time_slot: 480,
                day: 2,
                taken: true,
            }
        );
    }

    #[test]
    fn test_record_write_replaces_taken() {
        let schedule = schedule();
        let existing = AdherenceLog {
            prescription_id: 5,
            drug_id: 10,
            time_slot: 480,
            day: 1,
            taken: true,
        };

        let log = LogWrite::for_record(existing.clone(), false)
            .resolve(&schedule)
            .unwrap();
        assert!(!log.taken);
        assert_eq!(log.natural_key(), existing.natural_key());
    }

    #[test]
    fn test_record_from_other_prescription_rejected() {
        let schedule = schedule();
        let foreign = AdherenceLog {
            prescription_id: 6,
            drug_id: 10,
            time_slot: 480,
            day: 0,
            taken: false,
        };
        assert!(LogWrite::for_record(foreign, true).resolve(&schedule).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let schedule = schedule();
        let result = LogWrite::for_key(LogKey(999), true).resolve(&schedule);
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
    }
}
