//! Fire-and-forget reporting of resolved checkpoints.

use std::sync::Arc;

use storage::repository::OutcomeJournal;
use tracing::{debug, warn};
use trail_core::model::{CheckpointId, CheckpointOutcome, OutcomeKind};

use crate::api::{AnswerSubmission, CheckpointBackend, SkipSubmission, SubmissionAck};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubmissionRequest {
    Answer(AnswerSubmission),
    Skip(SkipSubmission),
}

/// What came back from one submission, tagged with the session generation
/// that issued it and its send order within that generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub generation: u64,
    pub sequence: u64,
    pub checkpoint_id: CheckpointId,
    pub kind: OutcomeKind,
    pub score_impact: Option<f64>,
    pub delivered: bool,
}

pub(crate) struct SubmissionJob {
    pub generation: u64,
    pub sequence: u64,
    pub request: SubmissionRequest,
    pub outcome: CheckpointOutcome,
    pub backend: Arc<dyn CheckpointBackend>,
    pub journal: Option<Arc<dyn OutcomeJournal>>,
}

async fn submit(
    backend: &dyn CheckpointBackend,
    request: &SubmissionRequest,
) -> Result<SubmissionAck, ApiError> {
    match request {
        SubmissionRequest::Answer(answer) => backend.submit_answer(answer).await,
        SubmissionRequest::Skip(skip) => backend.submit_skip(skip).await,
    }
}

/// Submit, journal, and report. Never fails: errors are logged and folded
/// into `delivered = false`.
pub(crate) async fn run(job: SubmissionJob) -> SubmissionReport {
    let SubmissionJob {
        generation,
        sequence,
        request,
        outcome,
        backend,
        journal,
    } = job;
    let checkpoint_id = outcome.checkpoint_id.clone();
    let kind = outcome.kind;

    let (outcome, score_impact, delivered) = match submit(backend.as_ref(), &request).await {
        Ok(ack) => {
            debug!(checkpoint = %checkpoint_id, kind = kind.label(), impact = ?ack.score_impact, "submission acknowledged");
            (outcome.acknowledged(ack.score_impact), ack.score_impact, true)
        }
        Err(err) => {
            warn!(checkpoint = %checkpoint_id, kind = kind.label(), error = %err, "checkpoint submission failed");
            (outcome, None, false)
        }
    };

    if let Some(journal) = journal {
        if let Err(err) = journal.append_outcome(&outcome).await {
            warn!(checkpoint = %checkpoint_id, error = %err, "failed to journal checkpoint outcome");
        }
    }

    SubmissionReport {
        generation,
        sequence,
        checkpoint_id,
        kind,
        score_impact,
        delivered,
    }
}
