//! In-video checkpoint questions: activation, resolution and reporting.

mod controller;
mod playback;
mod submission;
mod trigger;

pub use controller::{CheckpointController, CheckpointLoad, LoadedCheckpoints};
pub use playback::PlaybackControl;
pub use submission::SubmissionReport;
pub use trigger::{TriggerGate, find_trigger};
