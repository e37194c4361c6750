use thiserror::Error;

use crate::model::{CheckpointError, IdError, QuizError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
}
