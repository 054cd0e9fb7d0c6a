//! Composite keys for (slot, drug) takes and (take, day) log cells.
//!
//! ```text
//! TakeKey = slot_ordinal * drug_count + drug_ordinal
//! LogKey  = take_key * duration_days + day
//! ```
//!
//! Both keys are only meaningful together with the drug count and duration
//! they were composed with. Persist logs by natural key, never by `LogKey`.

use serde::{Deserialize, Serialize};

use super::{ScheduleError, ScheduleResult};

/// Composite key of a (slot, drug) pair.
///
/// Ascending key order groups takes by slot, then by drug within a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TakeKey(pub u64);

impl TakeKey {
    /// Compose the key of a (slot, drug) pair for a fixed drug count.
    pub fn compose(slot_ordinal: usize, drug_ordinal: usize, drug_count: usize) -> Self {
        Self(slot_ordinal as u64 * drug_count as u64 + drug_ordinal as u64)
    }

    /// Split into `(slot_ordinal, drug_ordinal)`.
    pub fn split(self, drug_count: usize) -> Option<(usize, usize)> {
        if drug_count == 0 {
            return None;
        }
        let count = drug_count as u64;
        Some(((self.0 / count) as usize, (self.0 % count) as usize))
    }
}

/// Composite key of a (take, day) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogKey(pub u64);

impl LogKey {
    /// Compose the key of a take on a day.
    ///
    /// `day` must lie in `[0, duration_days)`.
    pub fn compose(take: TakeKey, day: u32, duration_days: u32) -> ScheduleResult<Self> {
        if day >= duration_days {
            return Err(ScheduleError::InvalidInput(format!(
                "day {} outside course of {} days",
                day, duration_days
            )));
        }
        take.0
            .checked_mul(u64::from(duration_days))
            .and_then(|k| k.checked_add(u64::from(day)))
            .map(Self)
            .ok_or_else(|| {
                ScheduleError::InvalidInput(format!("log key overflow for take {}", take.0))
            })
    }

    /// Decode into `(take_key, day)`.
    pub fn decode(self, duration_days: u32) -> Option<(TakeKey, u32)> {
        if duration_days == 0 {
            return None;
        }
        let n = u64::from(duration_days);
        Some((TakeKey(self.0 / n), (self.0 % n) as u32))
    }
}

/// Sorted set of the take keys produced by a prescription, with dense ordinals.
///
/// The ordinal of a take is its position in ascending key order. It indexes
/// the cell arrays of each schedule day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TakeRegistry {
    drug_count: usize,
    keys: Vec<TakeKey>,
}

impl TakeRegistry {
    /// Build the registry from the (possibly repeated) keys of all doses.
    pub fn new(drug_count: usize, keys: impl IntoIterator<Item = TakeKey>) -> Self {
        let mut keys: Vec<TakeKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();
        Self { drug_count, keys }
    }

    /// Take ordinal of a key.
    pub fn ordinal(&self, key: TakeKey) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }

    /// Key at a take ordinal.
    pub fn key(&self, ordinal: usize) -> Option<TakeKey> {
        self.keys.get(ordinal).copied()
    }

    /// `(slot_ordinal, drug_ordinal)` of the take at an ordinal.
    pub fn split(&self, ordinal: usize) -> Option<(usize, usize)> {
        self.key(ordinal)?.split(self.drug_count)
    }

    /// Drug count the keys were composed with.
    pub fn drug_count(&self) -> usize {
        self.drug_count
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = TakeKey> + '_ {
        self.keys.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_key_groups_by_slot_then_drug() {
        let drug_count = 3;
        let a = TakeKey::compose(0, 2, drug_count);
        let b = TakeKey::compose(1, 0, drug_count);
        let c = TakeKey::compose(1, 1, drug_count);
        assert!(a < b && b < c);
        assert_eq!(b.split(drug_count), Some((1, 0)));
        assert_eq!(TakeKey(5).split(0), None);
    }

    #[test]
    fn test_log_key_decode() {
        let key = LogKey::compose(TakeKey(4), 2, 7).unwrap();
        assert_eq!(key, LogKey(30));
        assert_eq!(key.decode(7), Some((TakeKey(4), 2)));
        assert_eq!(key.decode(0), None);
    }

    #[test]
    fn test_log_key_rejects_day_outside_course() {
        assert!(matches!(
            LogKey::compose(TakeKey(0), 3, 3),
            Err(ScheduleError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_log_key_overflow_is_invalid_input() {
        let result = LogKey::compose(TakeKey(u64::MAX / 2), 1, 4);
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_registry_dense_ordinals() {
        let registry = TakeRegistry::new(2, [TakeKey(3), TakeKey(0), TakeKey(3), TakeKey(1)]);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.ordinal(TakeKey(0)), Some(0));
        assert_eq!(registry.ordinal(TakeKey(1)), Some(1));
        assert_eq!(registry.ordinal(TakeKey(3)), Some(2));
        assert_eq!(registry.ordinal(TakeKey(2)), None);
        assert_eq!(registry.split(2), Some((1, 1)));
        assert_eq!(registry.key(3), None);
    }
}
