pub const LEARNER_STATES: &str = "learner_states";
pub const ANSWER_HISTORY: &str = "answer_history";
pub const META: &str = "meta";
