//! Pushing a repaired plan to the signal controller.

use tracing::{debug, warn};

use crate::error::OptimizeError;
use crate::sim::{ProgramLogic, SignalController, SignalId, SignalPhase};

/// Copies `base` under a new id with every phase pinned to its new duration.
///
/// Minimum, maximum and nominal duration are all set to the same value so
/// an actuated controller cannot stretch or shorten the phase.
#[must_use]
pub fn pinned_logic(base: &ProgramLogic, durations: &[u32], program_id: &str) -> ProgramLogic {
    let phases = base
        .phases
        .iter()
        .zip(durations)
        .map(|(phase, &d)| {
            let d = f64::from(d);
            SignalPhase {
                duration: d,
                min_duration: d,
                max_duration: d,
                state: phase.state.clone(),
                name: phase.name.clone(),
            }
        })
        .collect();
    ProgramLogic {
        program_id: program_id.to_string(),
        kind: base.kind,
        current_phase_index: base.current_phase_index,
        phases,
    }
}

/// Defines the new program, activates it and restarts it from phase 0.
///
/// Only the definition step is required to succeed. A controller that
/// rejects activation or the phase reset keeps running whatever program it
/// had, and the rejection is logged.
///
/// # Errors
///
/// Returns [`OptimizeError::Commit`] if the program definition is rejected.
pub fn commit_plan<C: SignalController + ?Sized>(
    ctl: &mut C,
    signal: &SignalId,
    logic: ProgramLogic,
) -> Result<(), OptimizeError> {
    let program_id = logic.program_id.clone();
    ctl.set_program_logic(signal, logic)
        .map_err(|source| OptimizeError::Commit {
            program_id: program_id.clone(),
            source,
        })?;

    if let Err(e) = ctl.set_program(signal, &program_id) {
        warn!(signal = %signal, program = %program_id, error = %e, "program activation rejected");
    }
    if let Err(e) = ctl.set_phase(signal, 0) {
        warn!(signal = %signal, program = %program_id, error = %e, "phase reset rejected");
    }
    debug!(signal = %signal, program = %program_id, "program committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;
    use crate::sim::{LogicKind, SyntheticEnvironment, active_logic};

    #[test]
    fn pinned_logic_sets_all_three_durations() {
        let base = ProgramLogic {
            program_id: "0".into(),
            kind: LogicKind::Actuated,
            current_phase_index: 2,
            phases: vec![
                SignalPhase::fixed(42.0, "GGrr"),
                SignalPhase::fixed(3.0, "yyrr"),
            ],
        };
        let logic = pinned_logic(&base, &[70, 50], "opt_9");
        assert_eq!(logic.program_id, "opt_9");
        assert_eq!(logic.kind, LogicKind::Actuated);
        assert_eq!(logic.current_phase_index, 2);
        assert!((logic.phases[0].duration - 70.0).abs() < f64::EPSILON);
        assert!((logic.phases[0].min_duration - 70.0).abs() < f64::EPSILON);
        assert!((logic.phases[0].max_duration - 70.0).abs() < f64::EPSILON);
        assert_eq!(logic.phases[1].state, "yyrr");
    }

    #[test]
    fn commit_activates_and_resets_phase() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let j0 = SignalId::new("J0");
        env.set_phase(&j0, 2).unwrap();
        let base = active_logic(&env, &j0).unwrap();
        commit_plan(&mut env, &j0, pinned_logic(&base, &[30, 30, 30, 30], "opt_1")).unwrap();
        assert_eq!(env.program(&j0).unwrap(), "opt_1");
        assert_eq!(env.phase(&j0).unwrap(), 0);
    }

    #[test]
    fn rejected_definition_is_a_commit_error() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let j0 = SignalId::new("J0");
        let empty = ProgramLogic {
            program_id: "opt_1".into(),
            kind: LogicKind::Static,
            current_phase_index: 0,
            phases: Vec::new(),
        };
        let err = commit_plan(&mut env, &j0, empty).unwrap_err();
        assert!(matches!(err, OptimizeError::Commit { ref program_id, .. } if program_id == "opt_1"));
        assert_eq!(env.program(&j0).unwrap(), "0");
    }
}
