use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use trail_core::model::{CheckpointId, CheckpointQuestion, TrailId, VideoId};

use super::client::{ApiClient, NO_QUERY};
use super::dto::{
    AssessmentResult, CheckpointAnswerRequest, CheckpointAnswerResponse, CheckpointQuestionDto,
    CheckpointSkipRequest, CheckpointSkipResponse, EligibilityCheck, FinalAssessment,
    FinalAssessmentDto, FinalAssessmentSubmission, GenerateCheckpointsRequest,
    checkpoints_from_wire, impact_from_wire,
};
use crate::error::ApiError;

/// An answered checkpoint as reported to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSubmission {
    pub checkpoint_id: CheckpointId,
    pub video_id: VideoId,
    pub trail_id: Option<TrailId>,
    pub selected_answer: usize,
    pub is_correct: bool,
}

/// A skipped checkpoint as reported to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipSubmission {
    pub checkpoint_id: CheckpointId,
    pub video_id: VideoId,
    pub trail_id: Option<TrailId>,
}

/// Backend acknowledgement of an answer or skip.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionAck {
    pub message: String,
    /// Signed percentage delta on the trail's final grade, when the backend computed one.
    pub score_impact: Option<f64>,
}

/// Collaborator that generates checkpoints and scores the learner's choices.
#[async_trait]
pub trait CheckpointBackend: Send + Sync {
    /// Generate (or fetch cached) checkpoints for a video.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failures, non-success statuses, or
    /// payloads that fail validation.
    async fn generate_checkpoints(
        &self,
        video_id: &VideoId,
        duration_seconds: u64,
        transcript: &str,
    ) -> Result<Vec<CheckpointQuestion>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the backend did not accept the answer.
    async fn submit_answer(&self, answer: &AnswerSubmission) -> Result<SubmissionAck, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the backend did not accept the skip.
    async fn submit_skip(&self, skip: &SkipSubmission) -> Result<SubmissionAck, ApiError>;
}

/// HTTP implementation of the assessment routes.
#[derive(Clone, Debug)]
pub struct AssessmentClient {
    api: ApiClient,
}

#[derive(Serialize)]
struct DurationQuery {
    duration_seconds: u64,
}

#[derive(Serialize)]
struct VideoProgressQuery<'a> {
    trail_id: &'a str,
    video_id: &'a str,
    watched_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_seconds: Option<u64>,
}

impl AssessmentClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Checkpoints already generated for a video, without triggering generation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request or validation failure.
    pub async fn video_checkpoints(
        &self,
        video_id: &VideoId,
        duration_seconds: u64,
    ) -> Result<Vec<CheckpointQuestion>, ApiError> {
        let path = format!("/assessment/checkpoints/{video_id}");
        let dtos: Vec<CheckpointQuestionDto> = self
            .api
            .get_json(&path, &DurationQuery { duration_seconds })
            .await?;
        checkpoints_from_wire(dtos)
    }

    /// Record how much of a trail video has been watched.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    pub async fn update_video_progress(
        &self,
        trail_id: &TrailId,
        video_id: &VideoId,
        watched_seconds: u64,
        total_seconds: Option<u64>,
    ) -> Result<(), ApiError> {
        let query = VideoProgressQuery {
            trail_id: trail_id.as_str(),
            video_id: video_id.as_str(),
            watched_seconds,
            total_seconds,
        };
        self.api
            .patch_query("/assessment/progress/video", &query)
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on request or validation failure.
    pub async fn final_assessment(&self, trail_id: &TrailId) -> Result<FinalAssessment, ApiError> {
        let path = format!("/assessment/final/{trail_id}");
        let dto: FinalAssessmentDto = self.api.get_json(&path, NO_QUERY).await?;
        FinalAssessment::try_from(dto)
    }

    /// Submit answers keyed by question id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    pub async fn submit_final_assessment(
        &self,
        assessment_id: &str,
        answers: &BTreeMap<String, usize>,
    ) -> Result<AssessmentResult, ApiError> {
        let body = FinalAssessmentSubmission {
            assessment_id,
            answers,
        };
        self.api.post_json("/assessment/final/submit", &body).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on request failure.
    pub async fn check_eligibility(&self, trail_id: &TrailId) -> Result<EligibilityCheck, ApiError> {
        let path = format!("/assessment/eligibility/{trail_id}");
        self.api.get_json(&path, NO_QUERY).await
    }
}

#[async_trait]
impl CheckpointBackend for AssessmentClient {
    async fn generate_checkpoints(
        &self,
        video_id: &VideoId,
        duration_seconds: u64,
        transcript: &str,
    ) -> Result<Vec<CheckpointQuestion>, ApiError> {
        let body = GenerateCheckpointsRequest {
            video_id: video_id.as_str(),
            duration_seconds,
            transcript,
        };
        let dtos: Vec<CheckpointQuestionDto> = self
            .api
            .post_json("/assessment/checkpoints/generate", &body)
            .await?;
        checkpoints_from_wire(dtos)
    }

    async fn submit_answer(&self, answer: &AnswerSubmission) -> Result<SubmissionAck, ApiError> {
        let body = CheckpointAnswerRequest {
            checkpoint_id: answer.checkpoint_id.as_str(),
            video_id: answer.video_id.as_str(),
            trail_id: answer.trail_id.as_ref().map(TrailId::as_str),
            selected_answer: answer.selected_answer,
            is_correct: answer.is_correct,
        };
        let resp: CheckpointAnswerResponse = self
            .api
            .post_json("/assessment/checkpoint/answer", &body)
            .await?;
        if !resp.success {
            return Err(ApiError::Rejected(resp.message));
        }
        Ok(SubmissionAck {
            message: resp.message,
            score_impact: impact_from_wire(resp.score_impact),
        })
    }

    async fn submit_skip(&self, skip: &SkipSubmission) -> Result<SubmissionAck, ApiError> {
        let body = CheckpointSkipRequest {
            checkpoint_id: skip.checkpoint_id.as_str(),
            video_id: skip.video_id.as_str(),
            trail_id: skip.trail_id.as_ref().map(TrailId::as_str),
        };
        let resp: CheckpointSkipResponse = self
            .api
            .post_json("/assessment/checkpoint/skip", &body)
            .await?;
        if !resp.success {
            return Err(ApiError::Rejected(resp.message));
        }
        Ok(SubmissionAck {
            message: resp.message,
            score_impact: impact_from_wire(resp.score_impact),
        })
    }
}
