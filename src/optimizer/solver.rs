//! Solvers for the phase-duration program.
//!
//! The program is `minimize cᵀd` subject to `min <= dᵢ <= max` and
//! `Σ dᵢ = total`. Any [`PhaseSolver`] may be plugged into the optimizer.

use serde::Serialize;

/// Box bounds and the sum equality shared by every phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Lower bound per phase
    pub min: f64,
    /// Upper bound per phase
    pub max: f64,
    /// Required sum of all phases
    pub total: f64,
}

impl Bounds {
    /// Returns `true` if `n` phases can satisfy the bounds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn admits(&self, n: usize) -> bool {
        let n = n as f64;
        n > 0.0
            && self.min.is_finite()
            && self.max.is_finite()
            && self.total.is_finite()
            && self.min <= self.max
            && n * self.min <= self.total
            && n * self.max >= self.total
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// An optimal point was found
    Optimal(Vec<f64>),
    /// No point satisfies the constraints
    Infeasible,
}

impl SolveStatus {
    /// Short name for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal(_) => "optimal",
            Self::Infeasible => "infeasible",
        }
    }
}

/// A solver for the bounded, sum-constrained linear program.
pub trait PhaseSolver: Send + Sync {
    /// Minimizes `coefficients · d` over the feasible set.
    fn solve(&self, coefficients: &[f64], bounds: &Bounds) -> SolveStatus;

    /// Solver name for logs.
    fn name(&self) -> &'static str;
}

/// Exact solver for a separable linear objective.
///
/// Every phase starts at the lower bound; the remaining time goes to the
/// cheapest phases first, each filled to the upper bound before the next.
/// Ties go to the lower phase index.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyBoxSolver;

impl PhaseSolver for GreedyBoxSolver {
    fn solve(&self, coefficients: &[f64], bounds: &Bounds) -> SolveStatus {
        if !bounds.admits(coefficients.len()) {
            return SolveStatus::Infeasible;
        }

        let mut durations = vec![bounds.min; coefficients.len()];
        #[allow(clippy::cast_precision_loss)]
        let mut remaining = bounds.min.mul_add(-(coefficients.len() as f64), bounds.total);

        let mut order: Vec<usize> = (0..coefficients.len()).collect();
        order.sort_by(|&a, &b| coefficients[a].total_cmp(&coefficients[b]));

        let headroom = bounds.max - bounds.min;
        for i in order {
            if remaining <= 0.0 {
                break;
            }
            let add = remaining.min(headroom);
            durations[i] += add;
            remaining -= add;
        }

        SolveStatus::Optimal(durations)
    }

    fn name(&self) -> &'static str {
        "greedy-box"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds {
        min: 5.0,
        max: 60.0,
        total: 120.0,
    };

    #[test]
    fn fills_cheapest_phases_first() {
        let status = GreedyBoxSolver.solve(&[1.0, 1.1, 1.2, 1.3], &BOUNDS);
        assert_eq!(status, SolveStatus::Optimal(vec![60.0, 50.0, 5.0, 5.0]));
    }

    #[test]
    fn ties_break_by_index() {
        let status = GreedyBoxSolver.solve(&[2.0, 1.0, 1.0, 2.0], &BOUNDS);
        assert_eq!(status, SolveStatus::Optimal(vec![5.0, 60.0, 50.0, 5.0]));
    }

    #[test]
    fn too_many_phases_for_cycle_is_infeasible() {
        let coefficients = vec![1.0; 25];
        assert_eq!(GreedyBoxSolver.solve(&coefficients, &BOUNDS), SolveStatus::Infeasible);
    }

    #[test]
    fn too_few_phases_for_cycle_is_infeasible() {
        assert_eq!(GreedyBoxSolver.solve(&[1.0], &BOUNDS), SolveStatus::Infeasible);
    }

    #[test]
    fn zero_phases_is_infeasible() {
        assert_eq!(GreedyBoxSolver.solve(&[], &BOUNDS), SolveStatus::Infeasible);
    }

    #[test]
    fn solution_sums_to_total() {
        let SolveStatus::Optimal(d) = GreedyBoxSolver.solve(&[3.0, 1.0, 2.0, 0.5, 0.7], &BOUNDS)
        else {
            panic!("expected optimal");
        };
        assert!((d.iter().sum::<f64>() - 120.0).abs() < 1e-9);
        assert!(d.iter().all(|x| (5.0..=60.0).contains(x)));
    }
}
