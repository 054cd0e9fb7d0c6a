//! Ordinal index assignment for drugs and time slots.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use icu_collator::{Collator, CollatorOptions, Strength};

use super::{ScheduleError, ScheduleResult};
use crate::models::{Drug, DrugId, ScheduledDose, TimeSlot};

/// Dense ordering of the drugs referenced by a prescription's doses.
///
/// Drugs are sorted by description with a [`DescriptionCollator`]; equal
/// descriptions keep catalog order. Ordinals are positions in that ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugIndex {
    drugs: Vec<Drug>,
    by_id: HashMap<DrugId, usize>,
}

impl DrugIndex {
    /// Index the distinct drugs referenced by `doses`, resolved against `catalog`.
    ///
    /// Fails with [`ScheduleError::Integrity`] when a dose names a drug the
    /// catalog does not contain.
    pub fn build<'a>(
        doses: impl IntoIterator<Item = &'a ScheduledDose>,
        catalog: &[Drug],
    ) -> ScheduleResult<Self> {
        let mut catalog_pos: HashMap<DrugId, usize> = HashMap::with_capacity(catalog.len());
        for (pos, drug) in catalog.iter().enumerate() {
            catalog_pos.entry(drug.id).or_insert(pos);
        }

        let mut seen = HashSet::new();
        let mut referenced = Vec::new();
        for dose in doses {
            if !seen.insert(dose.drug_id) {
                continue;
            }
            let pos = catalog_pos
                .get(&dose.drug_id)
                .copied()
                .ok_or(ScheduleError::Integrity {
                    drug_id: dose.drug_id,
                })?;
            referenced.push(pos);
        }

        let collator = DescriptionCollator::root()?;
        referenced.sort_by(|a, b| {
            collator
                .compare(&catalog[*a].description, &catalog[*b].description)
                .then(a.cmp(b))
        });

        let drugs: Vec<Drug> = referenced.into_iter().map(|pos| catalog[pos].clone()).collect();
        let by_id = drugs
            .iter()
            .enumerate()
            .map(|(ordinal, drug)| (drug.id, ordinal))
            .collect();

        Ok(Self { drugs, by_id })
    }

    /// Ordinal of a drug, if referenced.
    pub fn ordinal(&self, drug_id: DrugId) -> Option<usize> {
        self.by_id.get(&drug_id).copied()
    }

    /// Drug at an ordinal.
    pub fn get(&self, ordinal: usize) -> Option<&Drug> {
        self.drugs.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    /// Drugs in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &Drug> {
        self.drugs.iter()
    }
}

/// Dense ascending ordering of the time slots referenced by a prescription's doses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    times: Vec<TimeSlot>,
}

impl SlotIndex {
    /// Index the distinct time slots of `doses`.
    pub fn build<'a>(doses: impl IntoIterator<Item = &'a ScheduledDose>) -> Self {
        let mut times: Vec<TimeSlot> = doses.into_iter().map(|d| d.time_slot).collect();
        times.sort_unstable();
        times.dedup();
        Self { times }
    }

    /// Ordinal of a time slot, if referenced.
    pub fn ordinal(&self, time: TimeSlot) -> Option<usize> {
        self.times.binary_search(&time).ok()
    }

    /// Time slot at an ordinal.
    pub fn get(&self, ordinal: usize) -> Option<TimeSlot> {
        self.times.get(ordinal).copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time slots in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = TimeSlot> + '_ {
        self.times.iter().copied()
    }
}

/// Spreadsheet-style column label: `0 → A`, `25 → Z`, `26 → AA`, `27 → AB`.
///
/// Display only. Keys are never derived from labels.
pub fn column_label(ordinal: usize) -> String {
    let mut n = ordinal as u128 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Locale-aware ordering of drug descriptions.
///
/// Unicode collation at the root locale with tertiary strength: base letters
/// first (accents fold, so `É` sorts with `E`), then accents, then case with
/// lowercase before uppercase.
pub struct DescriptionCollator {
    collator: Collator,
}

impl DescriptionCollator {
    pub fn root() -> ScheduleResult<Self> {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);
        let collator = Collator::try_new(&Default::default(), options)
            .map_err(|e| ScheduleError::Collation(e.to_string()))?;
        Ok(Self { collator })
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dose(drug_id: DrugId, time_slot: TimeSlot) -> ScheduledDose {
        ScheduledDose::daily(1, drug_id, 1.0, time_slot)
    }

    #[test]
    fn test_label_sequence() {
        let labels: Vec<String> = (0..28).map(column_label).collect();
        assert_eq!(labels[0], "A");
        assert_eq!(labels[1], "B");
        assert_eq!(labels[25], "Z");
        assert_eq!(labels[26], "AA");
        assert_eq!(labels[27], "AB");
    }

    #[test]
    fn test_label_wraps_to_three_letters() {
        assert_eq!(column_label(51), "AZ");
        assert_eq!(column_label(52), "BA");
        assert_eq!(column_label(701), "ZZ");
        assert_eq!(column_label(702), "AAA");
    }

    #[test]
    fn test_collate_ignores_case_first() {
        let c = DescriptionCollator::root().unwrap();
        assert_eq!(c.compare("aspirin", "Zinc"), Ordering::Less);
        assert_eq!(c.compare("Zinc", "aspirin"), Ordering::Greater);
        assert_eq!(c.compare("ibuprofen", "Ibuprofen"), Ordering::Less);
        assert_eq!(c.compare("Aspirin", "Aspirin"), Ordering::Equal);
        assert_eq!(c.compare("Aspirin", "Aspirin C"), Ordering::Less);
    }

    #[test]
    fn test_collate_folds_accents() {
        let c = DescriptionCollator::root().unwrap();
        assert_eq!(c.compare("Échinacea", "Zinc"), Ordering::Less);
        assert_eq!(c.compare("Échinacea", "Aspirin"), Ordering::Greater);
        assert_eq!(c.compare("Echinacea", "Échinacea"), Ordering::Less);
        assert_eq!(c.compare("Ñame", "Nystatin"), Ordering::Less);
    }

    #[test]
    fn test_drug_index_accented_description() {
        let catalog = vec![Drug::new(20, "Zinc"), Drug::new(40, "Échinacea")];
        let doses = vec![dose(20, 480), dose(40, 480)];

        let index = DrugIndex::build(&doses, &catalog).unwrap();
        assert_eq!(index.ordinal(40), Some(0));
        assert_eq!(index.ordinal(20), Some(1));
    }

    #[test]
    fn test_drug_index_sorted_by_description() {
        let catalog = vec![
            Drug::new(20, "Zinc"),
            Drug::new(30, "Unused"),
            Drug::new(10, "Aspirin"),
        ];
        let doses = vec![dose(20, 480), dose(10, 480), dose(20, 1200)];

        let index = DrugIndex::build(&doses, &catalog).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.ordinal(10), Some(0));
        assert_eq!(index.ordinal(20), Some(1));
        assert_eq!(index.ordinal(30), None);
        assert_eq!(index.get(0).unwrap().description, "Aspirin");
    }

    #[test]
    fn test_drug_index_ties_keep_catalog_order() {
        let catalog = vec![
            Drug::new(7, "Vitamin D"),
            Drug::new(3, "Vitamin D"),
        ];
        let doses = vec![dose(3, 480), dose(7, 480)];

        let index = DrugIndex::build(&doses, &catalog).unwrap();
        assert_eq!(index.ordinal(7), Some(0));
        assert_eq!(index.ordinal(3), Some(1));
    }

    #[test]
    fn test_drug_index_missing_drug_is_integrity_error() {
        let catalog = vec![Drug::new(10, "Aspirin")];
        let doses = vec![dose(10, 480), dose(99, 480)];

        let err = DrugIndex::build(&doses, &catalog).unwrap_err();
        assert_eq!(err, ScheduleError::Integrity { drug_id: 99 });
    }

    #[test]
    fn test_slot_index_ascending_and_distinct() {
        let doses = vec![dose(1, 1200), dose(2, 480), dose(3, 1200), dose(1, 720)];
        let index = SlotIndex::build(&doses);

        assert_eq!(index.iter().collect::<Vec<_>>(), vec![480, 720, 1200]);
        assert_eq!(index.ordinal(720), Some(1));
        assert_eq!(index.ordinal(600), None);
        assert_eq!(index.get(2), Some(1200));
    }

    #[test]
    fn test_empty_doses_give_empty_indices() {
        let catalog = vec![Drug::new(10, "Aspirin")];
        let doses: Vec<ScheduledDose> = Vec::new();
        assert!(DrugIndex::build(&doses, &catalog).unwrap().is_empty());
        assert!(SlotIndex::build(&doses).is_empty());
    }
}
