//! Wire shapes exchanged with the backend.
//!
//! Everything the backend sends is parsed into these structs and converted
//! into domain types exactly once, here.

use serde::{Deserialize, Serialize};
use trail_core::model::{CheckpointId, CheckpointQuestion, QuestionId, QuizQuestion, TrailId};

use crate::error::ApiError;

fn index_from_wire(field: &'static str, value: i64) -> Result<usize, ApiError> {
    usize::try_from(value).map_err(|_| ApiError::field(field, format!("negative index {value}")))
}

//
// ─── CHECKPOINTS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointQuestionDto {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: Option<String>,
    pub timestamp_seconds: f64,
}

impl TryFrom<CheckpointQuestionDto> for CheckpointQuestion {
    type Error = ApiError;

    fn try_from(dto: CheckpointQuestionDto) -> Result<Self, Self::Error> {
        let id = CheckpointId::new(dto.id)?;
        let correct_answer = index_from_wire("correct_answer", dto.correct_answer)?;
        Ok(CheckpointQuestion::new(
            id,
            dto.question,
            dto.options,
            correct_answer,
            dto.timestamp_seconds,
            dto.explanation,
        )?)
    }
}

/// Convert a whole generated list, failing on the first invalid entry.
pub(crate) fn checkpoints_from_wire(
    dtos: Vec<CheckpointQuestionDto>,
) -> Result<Vec<CheckpointQuestion>, ApiError> {
    dtos.into_iter().map(CheckpointQuestion::try_from).collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateCheckpointsRequest<'a> {
    pub video_id: &'a str,
    pub duration_seconds: u64,
    pub transcript: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckpointAnswerRequest<'a> {
    pub checkpoint_id: &'a str,
    pub video_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_id: Option<&'a str>,
    pub selected_answer: usize,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckpointSkipRequest<'a> {
    pub checkpoint_id: &'a str,
    pub video_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointAnswerResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    pub is_correct: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub score_impact: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointSkipResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub score_impact: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// A non-finite impact is treated as absent.
pub(crate) fn impact_from_wire(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

//
// ─── FINAL ASSESSMENT ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Deserialize)]
pub struct FinalAssessmentQuestionDto {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalAssessmentDto {
    pub id: String,
    pub trail_id: String,
    pub questions: Vec<FinalAssessmentQuestionDto>,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub time_limit_minutes: u32,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// A question of a trail's final assessment with its point weight.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentQuestion {
    pub question: QuizQuestion,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalAssessment {
    pub id: String,
    pub trail_id: TrailId,
    pub questions: Vec<AssessmentQuestion>,
    pub total_points: u32,
    pub time_limit_minutes: u32,
    pub generated_at: Option<String>,
}

impl TryFrom<FinalAssessmentDto> for FinalAssessment {
    type Error = ApiError;

    fn try_from(dto: FinalAssessmentDto) -> Result<Self, Self::Error> {
        if dto.id.trim().is_empty() {
            return Err(ApiError::field("id", "empty assessment id"));
        }
        let trail_id = TrailId::new(dto.trail_id)?;
        let mut questions = Vec::with_capacity(dto.questions.len());
        for q in dto.questions {
            let correct_answer = index_from_wire("correct_answer", q.correct_answer)?;
            let question =
                QuizQuestion::new(QuestionId::new(q.id)?, q.question, q.options, correct_answer, "")?;
            questions.push(AssessmentQuestion {
                question,
                points: q.points,
            });
        }
        Ok(Self {
            id: dto.id,
            trail_id,
            questions,
            total_points: dto.total_points,
            time_limit_minutes: dto.time_limit_minutes,
            generated_at: dto.generated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FinalAssessmentSubmission<'a> {
    pub assessment_id: &'a str,
    pub answers: &'a std::collections::BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssessmentResult {
    pub assessment_id: String,
    pub trail_id: String,
    pub score: f64,
    pub total_points: f64,
    pub percentage: f64,
    pub passed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EligibilityCheck {
    pub trail_id: String,
    pub is_eligible: bool,
    pub completion_percentage: f64,
    pub checkpoint_average: f64,
    #[serde(default)]
    pub final_assessment_passed: Option<bool>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
}

//
// ─── CERTIFICATES ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Passed,
    ApprovedWithDistinction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub verification_code: String,
    pub student_name: String,
    pub trail_title: String,
    #[serde(default)]
    pub trail_description: Option<String>,
    pub final_score: f64,
    pub status: CertificateStatus,
    pub issued_at: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CertificateVerification {
    pub valid: bool,
    pub verification_code: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub trail_title: Option<String>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateCertificateRequest<'a> {
    pub trail_id: &'a str,
    pub student_name: &'a str,
}

//
// ─── GAMIFICATION ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub streak_days: u32,
    pub questions_today: u32,
    pub xp_today: u32,
    #[serde(default)]
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub target: u32,
    pub current: u32,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub reward_xp: u32,
    pub progress: u32,
    pub target: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationOverview {
    pub session: SessionStats,
    #[serde(default)]
    pub next_achievement: Option<Achievement>,
    #[serde(default)]
    pub missions: Vec<Mission>,
}

impl GamificationOverview {
    /// Placeholder dashboard shown when the backend cannot be reached.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            session: SessionStats {
                streak_days: 1,
                questions_today: 0,
                xp_today: 0,
                last_activity: None,
            },
            next_achievement: Some(Achievement {
                id: "starter".into(),
                name: "First Step".into(),
                description: "Answer your first question.".into(),
                icon: "target".into(),
                category: "Getting started".into(),
                target: 1,
                current: 0,
                completed: false,
            }),
            missions: vec![Mission {
                id: "first-quiz".into(),
                title: "First Lesson".into(),
                description: "Finish a quiz".into(),
                icon: "books".into(),
                reward_xp: 100,
                progress: 0,
                target: 1,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizStatsUpdate {
    pub student_id: String,
    pub questions_answered: u32,
    pub xp_earned: u32,
    pub correct_answers: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkpoint_dto_converts_and_validates() {
        let dto: CheckpointQuestionDto = serde_json::from_value(json!({
            "id": "cp-1",
            "question": "What does `?` do?",
            "options": ["Panics", "Propagates errors"],
            "correct_answer": 1,
            "timestamp_seconds": 42.0
        }))
        .unwrap();
        let q = CheckpointQuestion::try_from(dto).unwrap();
        assert_eq!(q.id().as_str(), "cp-1");
        assert_eq!(q.explanation(), None);
        assert_eq!(q.correct_answer(), 1);
    }

    #[test]
    fn negative_correct_answer_is_a_payload_error() {
        let dto = CheckpointQuestionDto {
            id: "cp-1".into(),
            question: "Q".into(),
            options: vec!["a".into()],
            correct_answer: -1,
            explanation: None,
            timestamp_seconds: 1.0,
        };
        let err = CheckpointQuestion::try_from(dto).unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[test]
    fn answer_request_omits_missing_trail() {
        let body = CheckpointAnswerRequest {
            checkpoint_id: "cp-1",
            video_id: "vid",
            trail_id: None,
            selected_answer: 2,
            is_correct: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "checkpoint_id": "cp-1",
                "video_id": "vid",
                "selected_answer": 2,
                "is_correct": false
            })
        );
    }

    #[test]
    fn answer_response_tolerates_missing_impact() {
        let resp: CheckpointAnswerResponse =
            serde_json::from_value(json!({"is_correct": true, "message": "ok"})).unwrap();
        assert!(resp.success);
        assert_eq!(resp.score_impact, None);
        assert_eq!(impact_from_wire(Some(f64::INFINITY)), None);
    }

    #[test]
    fn certificate_status_uses_snake_case() {
        let status: CertificateStatus =
            serde_json::from_value(json!("approved_with_distinction")).unwrap();
        assert_eq!(status, CertificateStatus::ApprovedWithDistinction);
    }

    #[test]
    fn final_assessment_rejects_bad_question() {
        let dto: FinalAssessmentDto = serde_json::from_value(json!({
            "id": "a1",
            "trail_id": "t1",
            "questions": [
                {"id": "q1", "question": "Q", "options": ["a", "b"], "correct_answer": 5, "points": 10}
            ],
            "total_points": 10,
            "time_limit_minutes": 30
        }))
        .unwrap();
        assert!(FinalAssessment::try_from(dto).is_err());
    }
}
