use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CheckpointId, TrailId, VideoId};

/// What the viewer did with an active checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeKind {
    Answered { selected: usize, correct: bool },
    Skipped,
}

impl OutcomeKind {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, OutcomeKind::Answered { correct: true, .. })
    }

    /// Stable label used by storage adapters.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            OutcomeKind::Answered { .. } => "answered",
            OutcomeKind::Skipped => "skipped",
        }
    }
}

/// Journal entry for a resolved checkpoint.
///
/// `synced` records whether the backend acknowledged the submission. Local
/// gameplay never waits for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointOutcome {
    pub checkpoint_id: CheckpointId,
    pub video_id: VideoId,
    pub trail_id: Option<TrailId>,
    pub kind: OutcomeKind,
    pub recorded_at: DateTime<Utc>,
    pub synced: bool,
    pub score_impact: Option<f64>,
}

impl CheckpointOutcome {
    #[must_use]
    pub fn new(
        checkpoint_id: CheckpointId,
        video_id: VideoId,
        trail_id: Option<TrailId>,
        kind: OutcomeKind,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            checkpoint_id,
            video_id,
            trail_id,
            kind,
            recorded_at,
            synced: false,
            score_impact: None,
        }
    }

    /// Mark the entry as acknowledged by the backend.
    #[must_use]
    pub fn acknowledged(mut self, score_impact: Option<f64>) -> Self {
        self.synced = true;
        self.score_impact = score_impact;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn acknowledged_sets_sync_flag_and_impact() {
        let outcome = CheckpointOutcome::new(
            CheckpointId::new("c1").unwrap(),
            VideoId::new("v1").unwrap(),
            None,
            OutcomeKind::Answered {
                selected: 2,
                correct: true,
            },
            fixed_now(),
        );
        assert!(!outcome.synced);

        let outcome = outcome.acknowledged(Some(5.0));
        assert!(outcome.synced);
        assert_eq!(outcome.score_impact, Some(5.0));
        assert!(outcome.kind.is_correct());
        assert_eq!(outcome.kind.label(), "answered");
        assert!(!OutcomeKind::Skipped.is_correct());
    }
}
