use std::sync::Arc;

use storage::repository::{OutcomeJournal, Storage};
use trail_core::model::{StudentId, TrailId, VideoId};

use crate::Clock;
use crate::api::{
    ApiClient, ApiConfig, AssessmentClient, CertificateClient, CheckpointBackend,
    HttpGamificationApi,
};
use crate::checkpoints::CheckpointController;
use crate::error::AppServicesError;
use crate::gamification::GamificationService;
use crate::quiz::QuizFlowService;

/// Assembles the app-facing services for one signed-in student.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    student: StudentId,
    assessment: Arc<AssessmentClient>,
    certificates: Arc<CertificateClient>,
    gamification: GamificationService,
    quiz_flow: Arc<QuizFlowService>,
    journal: Arc<dyn OutcomeJournal>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the HTTP
    /// client cannot be built.
    pub async fn new_sqlite(
        db_url: &str,
        api: ApiConfig,
        student: StudentId,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::with_storage(storage, api, student, clock)
    }

    /// Build services over an already opened storage backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Api` if the HTTP client cannot be built.
    pub fn with_storage(
        storage: Storage,
        api: ApiConfig,
        student: StudentId,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let client = ApiClient::new(api)?;
        let assessment = Arc::new(AssessmentClient::new(client.clone()));
        let certificates = Arc::new(CertificateClient::new(client.clone()));
        let gamification = GamificationService::new(
            Arc::new(HttpGamificationApi::new(client)),
            student.clone(),
        );
        let quiz_flow = Arc::new(
            QuizFlowService::new(clock, Arc::clone(&storage.quiz_results))
                .with_gamification(gamification.clone()),
        );

        Ok(Self {
            clock,
            student,
            assessment,
            certificates,
            gamification,
            quiz_flow,
            journal: Arc::clone(&storage.outcomes),
        })
    }

    #[must_use]
    pub fn student(&self) -> &StudentId {
        &self.student
    }

    #[must_use]
    pub fn assessment(&self) -> Arc<AssessmentClient> {
        Arc::clone(&self.assessment)
    }

    #[must_use]
    pub fn certificates(&self) -> Arc<CertificateClient> {
        Arc::clone(&self.certificates)
    }

    #[must_use]
    pub fn gamification(&self) -> &GamificationService {
        &self.gamification
    }

    #[must_use]
    pub fn quiz_flow(&self) -> Arc<QuizFlowService> {
        Arc::clone(&self.quiz_flow)
    }

    #[must_use]
    pub fn journal(&self) -> Arc<dyn OutcomeJournal> {
        Arc::clone(&self.journal)
    }

    /// A controller for one video, journaling into local storage.
    #[must_use]
    pub fn checkpoint_controller(
        &self,
        video_id: VideoId,
        trail_id: Option<TrailId>,
    ) -> CheckpointController {
        let backend: Arc<dyn CheckpointBackend> = self.assessment();
        CheckpointController::new(backend, video_id)
            .with_trail(trail_id)
            .with_journal(self.journal())
            .with_clock(self.clock)
    }
}
