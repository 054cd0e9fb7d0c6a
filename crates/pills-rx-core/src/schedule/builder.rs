//! Schedule builder: the pure orchestration step.

use std::collections::HashMap;

use chrono::Days;
use serde::{Deserialize, Serialize};

use super::{
    applies, column_label, slot_label, Day, DrugColumn, DrugIndex, LogCell, LogKey, Schedule,
    ScheduleError, ScheduleResult, SlotGroup, SlotIndex, TakeColumn, TakeKey, TakeRegistry,
};
use crate::models::{
    AdherenceLog, Drug, DrugId, Prescription, PrescriptionId, ScheduledDose, TimeSlot,
};

/// The four independently fetched collections a schedule is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSources {
    /// Prescription header; `None` when the read found nothing
    pub prescription: Option<Prescription>,
    /// Drug catalog (full or filtered)
    pub drugs: Vec<Drug>,
    /// Scheduled doses of the prescription
    pub doses: Vec<ScheduledDose>,
    /// Adherence logs; records of other prescriptions are ignored
    pub logs: Vec<AdherenceLog>,
}

/// A dose placed in the take registry.
struct PlacedDose<'a> {
    dose: &'a ScheduledDose,
    take_key: TakeKey,
    take_ordinal: usize,
}

/// Build the schedule of `prescription_id` from fetched collections.
///
/// Pure and synchronous. Either the whole schedule is returned or an error;
/// there is no partial result.
pub fn build_schedule(
    prescription_id: PrescriptionId,
    sources: &ScheduleSources,
) -> ScheduleResult<Schedule> {
    let prescription = sources
        .prescription
        .as_ref()
        .filter(|p| p.id == prescription_id)
        .ok_or(ScheduleError::NotFound(prescription_id))?;

    let duration_days = u32::try_from(prescription.duration_days).map_err(|_| {
        ScheduleError::InvalidInput(format!(
            "duration_days must be in 0..={}, got {}",
            u32::MAX,
            prescription.duration_days
        ))
    })?;

    let doses: Vec<&ScheduledDose> = sources
        .doses
        .iter()
        .filter(|d| d.prescription_id == prescription_id)
        .collect();

    let drug_index = DrugIndex::build(doses.iter().copied(), &sources.drugs)?;
    let slot_index = SlotIndex::build(doses.iter().copied());
    let drug_count = drug_index.len();

    let mut dose_keys = Vec::with_capacity(doses.len());
    for dose in &doses {
        let drug_ordinal = drug_index
            .ordinal(dose.drug_id)
            .ok_or(ScheduleError::Integrity {
                drug_id: dose.drug_id,
            })?;
        let slot_ordinal = slot_index.ordinal(dose.time_slot).ok_or_else(|| {
            ScheduleError::InvalidInput(format!("time slot {} not indexed", dose.time_slot))
        })?;
        dose_keys.push(TakeKey::compose(slot_ordinal, drug_ordinal, drug_count));
    }

    let registry = TakeRegistry::new(drug_count, dose_keys.iter().copied());

    let placed = doses
        .iter()
        .zip(&dose_keys)
        .map(|(dose, key)| {
            registry
                .ordinal(*key)
                .map(|take_ordinal| PlacedDose {
                    dose: *dose,
                    take_key: *key,
                    take_ordinal,
                })
                .ok_or_else(|| {
                    ScheduleError::InvalidInput(format!("take key {} not registered", key.0))
                })
        })
        .collect::<ScheduleResult<Vec<_>>>()?;

    if placed.is_empty() {
        tracing::debug!(prescription_id, "no doses, empty schedule");
        return Ok(Schedule {
            prescription_id,
            start_date: prescription.start_date,
            duration_days,
            drugs: Vec::new(),
            slots: Vec::new(),
            takes: Vec::new(),
            days: Vec::new(),
        });
    }

    let taken_by_cell: HashMap<(DrugId, TimeSlot, u32), bool> = sources
        .logs
        .iter()
        .filter(|log| log.prescription_id == prescription_id)
        .map(|log| ((log.drug_id, log.time_slot, log.day), log.taken))
        .collect();

    let mut days = Vec::new();
    for day in 0..duration_days {
        let mut cells: Vec<Option<LogCell>> = vec![None; registry.len()];
        let mut any = false;

        // Doses sharing a (slot, drug) column: the last applicable one wins.
        for p in &placed {
            if !applies(p.dose.recurrence.as_ref(), day, duration_days) {
                continue;
            }
            let taken = taken_by_cell
                .get(&(p.dose.drug_id, p.dose.time_slot, day))
                .copied()
                .unwrap_or(false);
            cells[p.take_ordinal] = Some(LogCell {
                take_ordinal: p.take_ordinal,
                log_key: LogKey::compose(p.take_key, day, duration_days)?,
                dose: p.dose.dose,
                taken,
            });
            any = true;
        }

        if !any {
            continue;
        }

        let date = prescription
            .start_date
            .checked_add_days(Days::new(u64::from(day)))
            .ok_or_else(|| {
                ScheduleError::InvalidInput(format!("day {} overflows the calendar", day))
            })?;
        days.push(Day { day, date, cells });
    }

    let drugs: Vec<DrugColumn> = drug_index
        .iter()
        .enumerate()
        .map(|(ordinal, drug)| DrugColumn {
            ordinal,
            label: column_label(ordinal),
            drug_id: drug.id,
            description: drug.description.clone(),
        })
        .collect();

    let takes = registry
        .iter()
        .enumerate()
        .map(|(ordinal, take_key)| {
            let (slot_ordinal, drug_ordinal) = take_key.split(drug_count)?;
            Some(TakeColumn {
                ordinal,
                take_key,
                slot_ordinal,
                drug_ordinal,
                time_slot: slot_index.get(slot_ordinal)?,
                drug_id: drug_index.get(drug_ordinal)?.id,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ScheduleError::InvalidInput("take key out of index range".into()))?;

    let slots = group_slots(&takes);

    tracing::debug!(
        prescription_id,
        drugs = drugs.len(),
        slots = slots.len(),
        takes = takes.len(),
        days = days.len(),
        "built schedule"
    );

    Ok(Schedule {
        prescription_id,
        start_date: prescription.start_date,
        duration_days,
        drugs,
        slots,
        takes,
        days,
    })
}

/// Compress runs of take columns sharing a time slot into header groups.
fn group_slots(takes: &[TakeColumn]) -> Vec<SlotGroup> {
    let mut groups: Vec<SlotGroup> = Vec::new();
    for take in takes {
        match groups.last_mut() {
            Some(group) if group.slot_ordinal == take.slot_ordinal => group.span += 1,
            _ => groups.push(SlotGroup {
                slot_ordinal: take.slot_ordinal,
                time_slot: take.time_slot,
                label: slot_label(take.time_slot),
                first_take: take.ordinal,
                span: 1,
            }),
        }
    }
    groups
}
