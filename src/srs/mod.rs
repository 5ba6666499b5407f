//! Spaced-repetition core: records, scheduling, due sets and session
//! composition, plus the [`ExamEngine`] facade that runs them against
//! persisted learner state.

pub mod adaptive;
pub mod composer;
pub mod due;
pub mod engine;
pub mod locks;
pub mod record;
pub mod scheduler;
pub mod statistics;

pub use composer::SessionFilter;
pub use due::DueItem;
pub use engine::{EngineError, EngineSettings, ExamEngine};
pub use record::LearningRecord;
pub use statistics::SrsStatistics;
