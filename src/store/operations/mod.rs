pub mod history;
pub mod learner_state;
