use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use services::api::GamificationApi;
use services::api::dto::{GamificationOverview, QuizStatsUpdate};
use services::{ApiError, Clock, FinalQuizSession, GamificationService, QuizFlowError, QuizFlowService};
use storage::repository::{InMemoryRepository, QuizResultRepository};
use trail_core::model::{CodingExercise, QuestionId, QuizError, QuizQuestion, StudentId, VideoId};
use trail_core::progress::StudentProgress;
use trail_core::time::fixed_now;

#[derive(Default)]
struct CapturingApi {
    updates: Mutex<Vec<QuizStatsUpdate>>,
}

#[async_trait]
impl GamificationApi for CapturingApi {
    async fn overview(&self, _student: &StudentId) -> Result<GamificationOverview, ApiError> {
        Ok(GamificationOverview::fallback())
    }

    async fn update_stats(&self, update: &QuizStatsUpdate) -> Result<(), ApiError> {
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn add_watch_time(&self, _student: &StudentId, _seconds: u64) -> Result<(), ApiError> {
        Ok(())
    }

    async fn complete_code_challenge(&self, _student: &StudentId) -> Result<(), ApiError> {
        Ok(())
    }

    async fn reset_streak(&self, _student: &StudentId) -> Result<(), ApiError> {
        Ok(())
    }
}

fn quiz() -> FinalQuizSession {
    let questions = (1..=4)
        .map(|n| {
            QuizQuestion::new(
                QuestionId::new(format!("q{n}")).unwrap(),
                format!("Question {n}"),
                vec!["a".into(), "b".into()],
                0,
                "",
            )
            .unwrap()
        })
        .collect();
    let exercise = CodingExercise {
        id: QuestionId::new("ex1").unwrap(),
        title: "Greeting".into(),
        description: "Print a greeting".into(),
        starter_code: None,
        expected_output: Some("hello".into()),
    };
    FinalQuizSession::new(VideoId::new("v1").unwrap(), None, questions, vec![exercise]).unwrap()
}

#[tokio::test]
async fn completing_a_quiz_stores_awards_and_reports() {
    let repo = InMemoryRepository::new();
    let api = Arc::new(CapturingApi::default());
    let gamification = GamificationService::new(api.clone(), StudentId::new("s1").unwrap());
    let flow = QuizFlowService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()))
        .with_gamification(gamification);

    let mut session = quiz();
    // q1, q2 first try; q3 second try; q4 exhausted.
    let plan: [&[usize]; 4] = [&[0], &[0], &[1, 0], &[1, 1]];
    for answers in plan {
        for &choice in answers {
            session.answer_current(choice).unwrap();
        }
        session.advance().unwrap();
    }
    session.set_code_answer("Hello, world").unwrap();

    let mut progress = StudentProgress::new(90);
    let completion = flow.complete(&mut session, &mut progress).await.unwrap();

    assert_eq!(completion.result.score(), 20 + 20 + 10 + 50);
    assert_eq!(completion.result.total_points(), 4 * 20 + 50);
    assert_eq!(completion.result.exhausted(), 1);
    assert!(completion.level_change.leveled_up());
    assert_eq!(progress.total_xp(), 190);

    let stored = repo.get_result(completion.result_id).await.unwrap();
    assert_eq!(stored, completion.result);
    assert_eq!(stored.completed_at(), fixed_now());

    let updates = api.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].student_id, "s1");
    assert_eq!(updates[0].questions_answered, 5);
    assert_eq!(updates[0].xp_earned, 100);
    assert_eq!(updates[0].correct_answers, 3);
}

#[tokio::test]
async fn unfinished_quiz_is_not_stored() {
    let repo = InMemoryRepository::new();
    let flow = QuizFlowService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()));
    let mut session = quiz();
    session.answer_current(0).unwrap();

    let mut progress = StudentProgress::default();
    let err = flow.complete(&mut session, &mut progress).await.unwrap_err();
    assert!(matches!(err, QuizFlowError::Quiz(QuizError::Unresolved)));
    assert_eq!(progress.total_xp(), 0);

    let video = VideoId::new("v1").unwrap();
    assert!(flow.recent_results(&video, 5).await.unwrap().is_empty());
}
