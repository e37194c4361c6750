use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::OutcomeJournal;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};
use trail_core::Clock;
use trail_core::model::{
    CheckpointId, CheckpointOutcome, CheckpointPhase, CheckpointQuestion, CheckpointScoreState,
    OutcomeKind, TrailId, VideoId,
};

use super::playback::PlaybackControl;
use super::submission::{self, SubmissionJob, SubmissionReport, SubmissionRequest};
use super::trigger::{TriggerGate, find_trigger};
use crate::api::{AnswerSubmission, CheckpointBackend, SkipSubmission};
use crate::error::ApiError;

/// Drives checkpoint activation for one video viewing session.
///
/// Owned by a single caller that pushes playback positions in through
/// [`CheckpointController::on_time_update`]. At most one checkpoint is active
/// at a time, and a resolved checkpoint never activates again until the
/// session is reset or reloaded.
///
/// Answers and skips are reported to the backend on spawned Tokio tasks, so
/// the controller must be used from within a Tokio runtime. Reports are
/// tagged with the session generation; those issued before the latest
/// load or reset are ignored. The backend's score impact is a running total,
/// so within a generation only the report of the latest submission counts,
/// whatever order the replies arrive in.
pub struct CheckpointController {
    backend: Arc<dyn CheckpointBackend>,
    journal: Option<Arc<dyn OutcomeJournal>>,
    player: Option<Box<dyn PlaybackControl>>,
    clock: Clock,
    video_id: VideoId,
    trail_id: Option<TrailId>,

    checkpoints: Vec<CheckpointQuestion>,
    resolved: HashMap<CheckpointId, CheckpointPhase>,
    current: Option<usize>,
    score: CheckpointScoreState,
    gate: TriggerGate,
    is_loading: bool,
    error: Option<String>,

    generation: u64,
    next_sequence: u64,
    applied_sequence: Option<u64>,
    in_flight: JoinSet<SubmissionReport>,
}

/// Checkpoint generation started by [`CheckpointController::begin_load`].
///
/// Owns everything the request needs, so the controller stays usable (and
/// reports `is_loading`) while [`CheckpointLoad::fetch`] runs.
pub struct CheckpointLoad {
    generation: u64,
    backend: Arc<dyn CheckpointBackend>,
    video_id: VideoId,
    duration_seconds: u64,
    transcript: String,
}

impl CheckpointLoad {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn fetch(self) -> LoadedCheckpoints {
        let result = self
            .backend
            .generate_checkpoints(&self.video_id, self.duration_seconds, &self.transcript)
            .await;
        LoadedCheckpoints {
            generation: self.generation,
            video_id: self.video_id,
            result,
        }
    }
}

/// Result of [`CheckpointLoad::fetch`], applied with
/// [`CheckpointController::finish_load`].
pub struct LoadedCheckpoints {
    generation: u64,
    video_id: VideoId,
    result: Result<Vec<CheckpointQuestion>, ApiError>,
}

impl CheckpointController {
    #[must_use]
    pub fn new(backend: Arc<dyn CheckpointBackend>, video_id: VideoId) -> Self {
        Self {
            backend,
            journal: None,
            player: None,
            clock: Clock::default(),
            video_id,
            trail_id: None,
            checkpoints: Vec::new(),
            resolved: HashMap::new(),
            current: None,
            score: CheckpointScoreState::default(),
            gate: TriggerGate::new(),
            is_loading: false,
            error: None,
            generation: 0,
            next_sequence: 0,
            applied_sequence: None,
            in_flight: JoinSet::new(),
        }
    }

    #[must_use]
    pub fn with_trail(mut self, trail_id: Option<TrailId>) -> Self {
        self.trail_id = trail_id;
        self
    }

    #[must_use]
    pub fn with_journal(mut self, journal: Arc<dyn OutcomeJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    #[must_use]
    pub fn with_player(mut self, player: Box<dyn PlaybackControl>) -> Self {
        self.player = Some(player);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    #[must_use]
    pub fn trail_id(&self) -> Option<&TrailId> {
        self.trail_id.as_ref()
    }

    #[must_use]
    pub fn checkpoints(&self) -> &[CheckpointQuestion] {
        &self.checkpoints
    }

    #[must_use]
    pub fn current_checkpoint(&self) -> Option<&CheckpointQuestion> {
        self.current.and_then(|index| self.checkpoints.get(index))
    }

    #[must_use]
    pub fn score(&self) -> CheckpointScoreState {
        self.score
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message of the last failed load, cleared by the next load or reset.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_completed(&self, id: &CheckpointId) -> bool {
        self.resolved.contains_key(id)
    }

    /// Ids answered or skipped in this session, in no particular order.
    pub fn completed(&self) -> impl Iterator<Item = &CheckpointId> {
        self.resolved.keys()
    }

    /// Phase of a loaded checkpoint, `None` for unknown ids.
    #[must_use]
    pub fn phase(&self, id: &CheckpointId) -> Option<CheckpointPhase> {
        if self.current_checkpoint().is_some_and(|cp| cp.id() == id) {
            return Some(CheckpointPhase::Active);
        }
        if let Some(phase) = self.resolved.get(id) {
            return Some(*phase);
        }
        self.checkpoints
            .iter()
            .any(|cp| cp.id() == id)
            .then_some(CheckpointPhase::Pending)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Submissions spawned but not yet reconciled.
    #[must_use]
    pub fn pending_submissions(&self) -> usize {
        self.in_flight.len()
    }

    //
    // ─── SESSION LIFECYCLE ─────────────────────────────────────────────────────
    //

    /// Generate checkpoints for the current video and start a fresh session.
    ///
    /// Failures are recorded in [`CheckpointController::error`] and leave the
    /// session without checkpoints. There is no retry. If this future is
    /// dropped early the controller stays loading until the next reset.
    pub async fn load_checkpoints(&mut self, transcript: &str, duration_seconds: f64) {
        let loaded = self.begin_load(transcript, duration_seconds).fetch().await;
        self.finish_load(loaded);
    }

    /// Start a fresh session and hand back the generation request.
    ///
    /// The controller reports `is_loading` and activates nothing until the
    /// matching [`CheckpointController::finish_load`].
    pub fn begin_load(&mut self, transcript: &str, duration_seconds: f64) -> CheckpointLoad {
        self.clear_session();
        self.is_loading = true;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let duration_seconds = duration_seconds.max(0.0).floor() as u64;

        CheckpointLoad {
            generation: self.generation,
            backend: Arc::clone(&self.backend),
            video_id: self.video_id.clone(),
            duration_seconds,
            transcript: transcript.to_owned(),
        }
    }

    /// Apply a fetched load. Returns `false` and changes nothing when a reset
    /// or another load happened after the matching `begin_load`.
    pub fn finish_load(&mut self, loaded: LoadedCheckpoints) -> bool {
        if loaded.generation != self.generation {
            debug!(
                video = %loaded.video_id,
                load_generation = loaded.generation,
                generation = self.generation,
                "discarding superseded checkpoint load"
            );
            return false;
        }
        self.is_loading = false;

        match loaded.result {
            Ok(checkpoints) => {
                info!(video = %self.video_id, count = checkpoints.len(), "checkpoints loaded");
                self.checkpoints = checkpoints;
            }
            Err(err) => {
                warn!(video = %self.video_id, error = %err, "checkpoint generation failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    /// Drop all session state. In-flight submissions still reach the backend,
    /// but their reports no longer affect this controller.
    pub fn reset_checkpoints(&mut self) {
        self.clear_session();
        debug!(video = %self.video_id, generation = self.generation, "checkpoints reset");
    }

    /// Reset and point the controller at another video.
    pub fn switch_video(&mut self, video_id: VideoId, trail_id: Option<TrailId>) {
        self.video_id = video_id;
        self.trail_id = trail_id;
        self.reset_checkpoints();
    }

    fn clear_session(&mut self) {
        self.checkpoints.clear();
        self.resolved.clear();
        self.current = None;
        self.score = CheckpointScoreState::default();
        self.gate.reset();
        self.is_loading = false;
        self.error = None;
        self.generation = self.generation.wrapping_add(1);
        self.next_sequence = 0;
        self.applied_sequence = None;
    }

    //
    // ─── PLAYBACK ──────────────────────────────────────────────────────────────
    //

    /// Feed a playback position. Returns the checkpoint activated by this
    /// update, if any.
    pub fn on_time_update(&mut self, time: f64, is_playing: bool) -> Option<&CheckpointQuestion> {
        self.poll_submissions();

        if self.current.is_some() || !is_playing || self.is_loading {
            self.gate.observe(time);
            return None;
        }
        if !self.gate.admit(time) {
            return None;
        }

        let index = find_trigger(&self.checkpoints, &self.resolved, time)?;
        let id = self.checkpoints[index].id();
        if let Err(err) = CheckpointPhase::Pending.transition(id, CheckpointPhase::Active) {
            warn!(error = %err, "refusing checkpoint activation");
            return None;
        }
        debug!(checkpoint = %id, time, "checkpoint activated");

        self.current = Some(index);
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        self.checkpoints.get(index)
    }

    /// Answer the active checkpoint. Returns whether the answer was correct,
    /// or `None` when nothing is active.
    pub fn handle_answer(&mut self, selected: usize) -> Option<bool> {
        let index = self.current?;
        let is_correct = self.checkpoints.get(index)?.is_correct(selected);

        self.resolve(
            index,
            CheckpointPhase::Answered,
            OutcomeKind::Answered {
                selected,
                correct: is_correct,
            },
        )?;
        self.score.record_answer(is_correct);
        Some(is_correct)
    }

    /// Skip the active checkpoint. Returns `false` when nothing is active.
    pub fn handle_skip(&mut self) -> bool {
        let Some(index) = self.current else {
            return false;
        };
        if self
            .resolve(index, CheckpointPhase::Skipped, OutcomeKind::Skipped)
            .is_none()
        {
            return false;
        }
        self.score.record_skip();
        true
    }

    fn resolve(&mut self, index: usize, to: CheckpointPhase, kind: OutcomeKind) -> Option<()> {
        let checkpoint = self.checkpoints.get(index)?;
        let id = checkpoint.id().clone();
        if let Err(err) = CheckpointPhase::Active.transition(&id, to) {
            warn!(error = %err, "refusing checkpoint resolution");
            return None;
        }

        let request = match kind {
            OutcomeKind::Answered { selected, correct } => {
                SubmissionRequest::Answer(AnswerSubmission {
                    checkpoint_id: id.clone(),
                    video_id: self.video_id.clone(),
                    trail_id: self.trail_id.clone(),
                    selected_answer: selected,
                    is_correct: correct,
                })
            }
            OutcomeKind::Skipped => SubmissionRequest::Skip(SkipSubmission {
                checkpoint_id: id.clone(),
                video_id: self.video_id.clone(),
                trail_id: self.trail_id.clone(),
            }),
        };
        let outcome = CheckpointOutcome::new(
            id.clone(),
            self.video_id.clone(),
            self.trail_id.clone(),
            kind,
            self.clock.now(),
        );
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.in_flight.spawn(submission::run(SubmissionJob {
            generation: self.generation,
            sequence,
            request,
            outcome,
            backend: Arc::clone(&self.backend),
            journal: self.journal.clone(),
        }));

        debug!(checkpoint = %id, kind = kind.label(), "checkpoint resolved");
        self.resolved.insert(id, to);
        self.current = None;
        if let Some(player) = self.player.as_mut() {
            player.resume();
        }
        Some(())
    }

    //
    // ─── RECONCILIATION ────────────────────────────────────────────────────────
    //

    /// Apply every submission report that has already finished. Never blocks.
    pub fn poll_submissions(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            self.reconcile(joined);
        }
    }

    /// Wait for every in-flight submission and apply its report.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            self.reconcile(joined);
        }
    }

    fn reconcile(&mut self, joined: Result<SubmissionReport, JoinError>) {
        let report = match joined {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "checkpoint submission task failed");
                return;
            }
        };
        if report.generation != self.generation {
            debug!(
                checkpoint = %report.checkpoint_id,
                report_generation = report.generation,
                generation = self.generation,
                "discarding stale submission report"
            );
            return;
        }
        if !report.score_impact.is_some_and(f64::is_finite) {
            return;
        }
        if self
            .applied_sequence
            .is_some_and(|applied| report.sequence < applied)
        {
            debug!(
                checkpoint = %report.checkpoint_id,
                sequence = report.sequence,
                "ignoring score impact older than the one applied"
            );
            return;
        }
        self.applied_sequence = Some(report.sequence);
        self.score.apply_impact(report.score_impact);
    }
}

impl Drop for CheckpointController {
    fn drop(&mut self) {
        // Let outstanding submissions finish on the runtime.
        self.in_flight.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::api::SubmissionAck;
    use async_trait::async_trait;

    struct StaticBackend(Vec<CheckpointQuestion>);

    #[async_trait]
    impl CheckpointBackend for StaticBackend {
        async fn generate_checkpoints(
            &self,
            _video_id: &VideoId,
            _duration_seconds: u64,
            _transcript: &str,
        ) -> Result<Vec<CheckpointQuestion>, ApiError> {
            Ok(self.0.clone())
        }

        async fn submit_answer(
            &self,
            _answer: &AnswerSubmission,
        ) -> Result<SubmissionAck, ApiError> {
            Ok(SubmissionAck::default())
        }

        async fn submit_skip(&self, _skip: &SkipSubmission) -> Result<SubmissionAck, ApiError> {
            Ok(SubmissionAck::default())
        }
    }

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

    #[tokio::test]
    async fn phases_follow_the_session() {
        let backend = Arc::new(StaticBackend(vec![cp("c1", 10.0)]));
        let mut controller = CheckpointController::new(backend, VideoId::new("v").unwrap());
        controller.load_checkpoints("transcript", 60.0).await;

        let id = CheckpointId::new("c1").unwrap();
        assert_eq!(controller.phase(&id), Some(CheckpointPhase::Pending));
        controller.on_time_update(9.0, true);
        assert!(controller.on_time_update(9.6, true).is_some());
        assert_eq!(controller.phase(&id), Some(CheckpointPhase::Active));

        assert!(controller.handle_skip());
        assert_eq!(controller.phase(&id), Some(CheckpointPhase::Skipped));
        assert!(!controller.handle_skip());
        assert_eq!(controller.phase(&CheckpointId::new("zz").unwrap()), None);

        controller.settle().await;
        assert_eq!(controller.pending_submissions(), 0);
    }

    #[tokio::test]
    async fn loading_is_visible_between_begin_and_finish() {
        let backend = Arc::new(StaticBackend(vec![cp("c1", 10.0)]));
        let mut controller = CheckpointController::new(backend, VideoId::new("v").unwrap());

        let load = controller.begin_load("transcript", 60.0);
        assert!(controller.is_loading());
        controller.on_time_update(9.0, true);
        assert!(controller.on_time_update(9.6, true).is_none());

        let loaded = load.fetch().await;
        assert!(controller.finish_load(loaded));
        assert!(!controller.is_loading());
        assert_eq!(controller.checkpoints().len(), 1);
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let backend = Arc::new(StaticBackend(vec![cp("c1", 10.0)]));
        let mut controller = CheckpointController::new(backend, VideoId::new("v").unwrap());

        let stale = controller.begin_load("transcript", 60.0).fetch().await;
        controller.reset_checkpoints();
        assert!(!controller.is_loading());

        assert!(!controller.finish_load(stale));
        assert!(controller.checkpoints().is_empty());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn paused_playback_never_activates() {
        let backend = Arc::new(StaticBackend(vec![cp("c1", 10.0)]));
        let mut controller = CheckpointController::new(backend, VideoId::new("v").unwrap());
        controller.load_checkpoints("transcript", 60.0).await;

        controller.on_time_update(9.0, false);
        assert!(controller.on_time_update(9.6, false).is_none());
        assert!(controller.on_time_update(10.0, false).is_none());
        assert!(controller.current_checkpoint().is_none());
    }
}
