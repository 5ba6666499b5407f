use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;
use sled::Transactional;

use crate::corpus::{QuestionId, QuestionType};
use crate::store::keys;
use crate::store::operations::learner_state::LearnerState;
use crate::store::{flatten_transaction_error, Store, StoreError};

/// One submitted answer, as kept in the learner's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub id: String,
    pub learner_id: String,
    pub question_id: QuestionId,
    pub is_correct: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub question_type: Option<QuestionType>,
    pub answered_at: DateTime<Utc>,
}

impl Store {
    /// Writes the updated learner state and appends the answer atomically.
    pub fn save_answer(
        &self,
        learner_id: &str,
        state: &LearnerState,
        answer: &AnswerRecord,
    ) -> Result<(), StoreError> {
        let state_key = keys::learner_state_key(learner_id)?;
        let answer_key = keys::answer_key(
            learner_id,
            answer.answered_at.timestamp_millis(),
            self.db.generate_id()?,
            &answer.id,
        )?;
        let state_value = Self::serialize(state)?;
        let answer_value = Self::serialize(answer)?;

        (&self.learner_states, &self.answer_history)
            .transaction(|(tx_states, tx_history)| {
                tx_states.insert(state_key.as_bytes(), state_value.as_slice())?;
                tx_history.insert(answer_key.as_bytes(), answer_value.as_slice())?;
                Ok::<(), ConflictableTransactionError<StoreError>>(())
            })
            .map_err(flatten_transaction_error)?;

        Ok(())
    }

    /// Newest first.
    pub fn list_answers(&self, learner_id: &str, limit: usize) -> Result<Vec<AnswerRecord>, StoreError> {
        let prefix = keys::answer_prefix(learner_id)?;
        let mut answers = Vec::new();
        if limit == 0 {
            return Ok(answers);
        }
        for item in self.answer_history.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            match Self::deserialize::<AnswerRecord>(&value) {
                Ok(answer) => answers.push(answer),
                Err(error) => {
                    tracing::warn!(learner_id, error = %error, "Skipping unreadable answer record");
                    continue;
                }
            }
            if answers.len() >= limit {
                break;
            }
        }
        Ok(answers)
    }

    pub fn count_answers(&self, learner_id: &str) -> Result<usize, StoreError> {
        let prefix = keys::answer_prefix(learner_id)?;
        let mut count = 0usize;
        for item in self.answer_history.scan_prefix(prefix.as_bytes()) {
            let _ = item?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;

    fn answer(learner_id: &str, question_id: QuestionId, at: DateTime<Utc>) -> AnswerRecord {
        AnswerRecord {
            id: uuid::Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            question_id,
            is_correct: question_id % 2 == 0,
            category: Some("共通".to_string()),
            department: None,
            question_type: Some(QuestionType::Basic),
            answered_at: at,
        }
    }

    #[test]
    fn answers_list_newest_first_per_learner() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let t0 = Utc::now();
        let state = LearnerState::default();

        for i in 0..5 {
            store
                .save_answer("alice", &state, &answer("alice", i, t0 + Duration::seconds(i as i64)))
                .unwrap();
        }
        store.save_answer("bob", &state, &answer("bob", 99, t0)).unwrap();

        let listed = store.list_answers("alice", 3).unwrap();
        let ids: Vec<_> = listed.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert_eq!(store.count_answers("alice").unwrap(), 5);
        assert_eq!(store.count_answers("bob").unwrap(), 1);
        assert!(store.list_answers("alice", 0).unwrap().is_empty());
    }

    #[test]
    fn same_millisecond_answers_list_newest_first() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        let at = Utc::now();
        let state = LearnerState::default();

        for question_id in 1..=20 {
            store
                .save_answer("alice", &state, &answer("alice", question_id, at))
                .unwrap();
        }

        let ids: Vec<_> = store
            .list_answers("alice", 20)
            .unwrap()
            .iter()
            .map(|a| a.question_id)
            .collect();
        assert_eq!(ids, (1..=20).rev().collect::<Vec<_>>());
    }
}
