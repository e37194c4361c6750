//! Typed HTTP collaborators for the learning backend.

pub mod assessment;
pub mod certificates;
pub mod client;
pub mod config;
pub mod dto;
pub mod gamification;

pub use assessment::{
    AnswerSubmission, AssessmentClient, CheckpointBackend, SkipSubmission, SubmissionAck,
};
pub use certificates::CertificateClient;
pub use client::ApiClient;
pub use config::ApiConfig;
pub use gamification::{GamificationApi, HttpGamificationApi};
