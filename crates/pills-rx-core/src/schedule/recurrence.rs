//! Recurrence evaluation.

use crate::models::Recurrence;

/// Decide whether a dose with the given rule applies on `day`.
///
/// Without a rule the dose applies every day. With a rule the cycle is the
/// rule's `cycle_length`, or `duration_days` when that is absent or zero. A
/// zero-length cycle never applies.
pub fn applies(recurrence: Option<&Recurrence>, day: u32, duration_days: u32) -> bool {
    let Some(rule) = recurrence else {
        return true;
    };

    let cycle = match rule.cycle_length {
        Some(len) if len > 0 => len,
        _ => duration_days,
    };
    if cycle == 0 {
        return false;
    }

    rule.days.contains(&(day % cycle))
}
