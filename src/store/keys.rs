use crate::store::StoreError;

const MAX_LEARNER_ID_LEN: usize = 128;

/// Learner ids become key prefixes, so the separator is reserved.
pub fn validate_learner_id(learner_id: &str) -> Result<(), StoreError> {
    if learner_id.is_empty() {
        return Err(StoreError::Validation("learner id must not be empty".to_string()));
    }
    if learner_id.len() > MAX_LEARNER_ID_LEN {
        return Err(StoreError::Validation(format!(
            "learner id longer than {MAX_LEARNER_ID_LEN} bytes"
        )));
    }
    if learner_id.contains(':') || learner_id.chars().any(char::is_control) {
        return Err(StoreError::Validation(
            "learner id contains a reserved character".to_string(),
        ));
    }
    Ok(())
}

pub fn learner_state_key(learner_id: &str) -> Result<String, StoreError> {
    validate_learner_id(learner_id)?;
    Ok(learner_id.to_string())
}

/// Newest answers sort first under the learner prefix. `sequence` must grow
/// with every write so answers within the same millisecond keep their order.
pub fn answer_key(
    learner_id: &str,
    timestamp_ms: i64,
    sequence: u64,
    answer_id: &str,
) -> Result<String, StoreError> {
    validate_learner_id(learner_id)?;
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    let reverse_seq = u64::MAX - sequence;
    Ok(format!(
        "{}:{:020}:{:020}:{}",
        learner_id, reverse_ts, reverse_seq, answer_id
    ))
}

pub fn answer_prefix(learner_id: &str) -> Result<String, StoreError> {
    validate_learner_id(learner_id)?;
    Ok(format!("{}:", learner_id))
}
