//! Integer rounding with sum repair.

use crate::error::OptimizeError;

/// Rounds a continuous solution to whole seconds that still satisfy the
/// bounds and sum exactly to `total`.
///
/// Each value is rounded to the nearest integer and clamped into
/// `[min, max]`. Any remaining difference from `total` is then removed one
/// second at a time, walking phases in index order and wrapping around,
/// skipping phases already at the bound in the needed direction.
///
/// # Errors
///
/// Returns [`OptimizeError::Infeasible`] if a full pass over the phases
/// cannot move the sum any closer to `total`.
pub fn repair_rounding(
    raw: &[f64],
    min: u32,
    max: u32,
    total: u32,
) -> Result<Vec<u32>, OptimizeError> {
    let infeasible = || OptimizeError::Infeasible {
        phases: raw.len(),
        cycle_time: total,
        min,
        max,
    };
    if raw.is_empty() || min > max {
        return Err(infeasible());
    }

    let (lo, hi) = (i64::from(min), i64::from(max));
    #[allow(clippy::cast_possible_truncation)]
    let mut durations: Vec<i64> = raw
        .iter()
        .map(|d| (d.round() as i64).clamp(lo, hi))
        .collect();

    let mut diff = i64::from(total) - durations.iter().sum::<i64>();
    let n = durations.len();
    let mut i = 0;
    let mut idle = 0;
    while diff != 0 {
        let d = &mut durations[i];
        let moved = if diff > 0 && *d < hi {
            *d += 1;
            diff -= 1;
            true
        } else if diff < 0 && *d > lo {
            *d -= 1;
            diff += 1;
            true
        } else {
            false
        };
        idle = if moved { 0 } else { idle + 1 };
        if idle >= n {
            return Err(infeasible());
        }
        i = (i + 1) % n;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(durations.into_iter().map(|d| d as u32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_that_keeps_sum_needs_no_repair() {
        let out = repair_rounding(&[29.6, 29.6, 30.4, 30.4], 5, 60, 120).unwrap();
        assert_eq!(out, vec![30, 30, 30, 30]);
    }

    #[test]
    fn rounded_sum_over_cycle_is_pulled_back() {
        // 31 + 31 + 30 + 29 = 121
        let out = repair_rounding(&[30.5, 30.5, 30.2, 28.8], 5, 60, 120).unwrap();
        assert_eq!(out.iter().sum::<u32>(), 120);
        assert_eq!(out, vec![30, 31, 30, 29]);
    }

    #[test]
    fn repair_skips_phases_at_bound() {
        // Clamps to 60 + 60 + 5 + 10 = 135. Phase 2 is already at the minimum
        // and is skipped on every pass.
        let out = repair_rounding(&[64.0, 61.0, 5.0, 9.6], 5, 60, 120).unwrap();
        assert_eq!(out.iter().sum::<u32>(), 120);
        assert!(out.iter().all(|d| (5..=60).contains(d)));
    }

    #[test]
    fn raw_values_outside_bounds_are_clamped() {
        let out = repair_rounding(&[-3.0, 200.0, 40.0, 40.0], 5, 60, 120).unwrap();
        assert_eq!(out.iter().sum::<u32>(), 120);
        assert!(out.iter().all(|d| (5..=60).contains(d)));
    }

    #[test]
    fn unreachable_total_is_an_error() {
        let err = repair_rounding(&[10.0, 10.0], 5, 60, 200).unwrap_err();
        assert!(matches!(err, OptimizeError::Infeasible { phases: 2, .. }));
    }

    #[test]
    fn empty_plan_is_an_error() {
        assert!(repair_rounding(&[], 5, 60, 120).is_err());
    }
}
