//! Final quiz attempts and their completion.

mod session;
mod workflow;

pub use session::{FinalQuizSession, QuizItem};
pub use workflow::{QuizCompletion, QuizFlowService};
