#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod checkpoints;
pub mod error;
pub mod gamification;
pub mod quiz;

pub use trail_core::Clock;

pub use api::{ApiClient, ApiConfig};
pub use app_services::AppServices;
pub use checkpoints::{
    CheckpointController, CheckpointLoad, LoadedCheckpoints, PlaybackControl, SubmissionReport,
};
pub use error::{ApiError, AppServicesError, PayloadError, QuizFlowError};
pub use gamification::GamificationService;
pub use quiz::{FinalQuizSession, QuizCompletion, QuizFlowService, QuizItem};
