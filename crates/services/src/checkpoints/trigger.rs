//! Time-driven activation rules.

use std::collections::HashMap;

use trail_core::model::{CheckpointId, CheckpointPhase, CheckpointQuestion};

/// Decides which playback observations are evaluated for activation.
///
/// An observation is admitted only when playback advanced past the previous
/// observation and its rounded second has not been evaluated yet. The first
/// observation after a reset only establishes the baseline.
#[derive(Debug, Clone, Default)]
pub struct TriggerGate {
    last_time: Option<f64>,
    last_second: Option<i64>,
}

impl TriggerGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position without evaluating it.
    pub fn observe(&mut self, time: f64) {
        if time.is_finite() {
            self.last_time = Some(time);
        }
    }

    /// Record a position and report whether it should be evaluated.
    #[allow(clippy::cast_possible_truncation)]
    pub fn admit(&mut self, time: f64) -> bool {
        if !time.is_finite() {
            return false;
        }
        let advancing = self.last_time.is_some_and(|previous| time > previous);
        self.last_time = Some(time);
        if !advancing {
            return false;
        }

        let second = time.round() as i64;
        if self.last_second == Some(second) {
            return false;
        }
        self.last_second = Some(second);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Index of the first checkpoint, in list order, that is still pending and
/// whose window contains `time`.
#[must_use]
pub fn find_trigger(
    checkpoints: &[CheckpointQuestion],
    resolved: &HashMap<CheckpointId, CheckpointPhase>,
    time: f64,
) -> Option<usize> {
    checkpoints
        .iter()
        .position(|cp| !resolved.contains_key(cp.id()) && cp.in_trigger_window(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(id: &str, ts: f64) -> CheckpointQuestion {
        CheckpointQuestion::new(
            CheckpointId::new(id).unwrap(),
            "Q",
            vec!["a".into(), "b".into()],
            0,
            ts,
            None,
        )
        .unwrap()
    }

    #[test]
    fn first_observation_is_only_a_baseline() {
        let mut gate = TriggerGate::new();
        assert!(!gate.admit(9.0));
        assert!(gate.admit(9.6));
    }

    #[test]
    fn same_rounded_second_is_evaluated_once() {
        let mut gate = TriggerGate::new();
        gate.observe(9.0);
        assert!(gate.admit(9.6));
        assert!(!gate.admit(10.2));
        assert!(gate.admit(10.9));
    }

    #[test]
    fn rewinding_is_not_advancing() {
        let mut gate = TriggerGate::new();
        gate.observe(30.0);
        assert!(!gate.admit(12.0));
        assert!(gate.admit(12.6));
        assert!(!gate.admit(f64::NAN));
    }

    #[test]
    fn reset_forgets_baseline_and_second() {
        let mut gate = TriggerGate::new();
        gate.observe(9.0);
        assert!(gate.admit(9.6));
        gate.reset();
        assert!(!gate.admit(9.7));
        assert!(gate.admit(9.8));
    }

    #[test]
    fn first_pending_match_wins() {
        let list = vec![cp("a", 10.0), cp("b", 11.0)];
        let mut resolved = HashMap::new();
        assert_eq!(find_trigger(&list, &resolved, 10.6), Some(0));

        resolved.insert(CheckpointId::new("a").unwrap(), CheckpointPhase::Skipped);
        assert_eq!(find_trigger(&list, &resolved, 10.6), Some(1));
        assert_eq!(find_trigger(&list, &resolved, 13.0), None);
    }
}
