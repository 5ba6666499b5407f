use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::corpus::QuestionId;
use crate::srs::record::{normalize_entry, parse_question_id, LearningRecord, NormalizedEntry};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Everything mutable the engine keeps for one learner.
///
/// SRS entries stay as raw JSON so damaged or legacy entries survive a
/// read-modify-write untouched; they are interpreted through
/// [`normalize_entry`] only. The map keeps insertion order, which is the
/// order questions were first answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerState {
    #[serde(default)]
    pub srs: Map<String, Value>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
}

impl LearnerState {
    /// Tolerant decode: a non-object `srs` becomes empty, numeric bookmarks
    /// become strings, anything else in the bookmark list is dropped.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            tracing::warn!("Learner state is not an object, starting empty");
            return Self::default();
        };

        let srs = match root.remove("srs") {
            Some(Value::Object(map)) => canonicalize_keys(map),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                tracing::warn!("Learner SRS map is not an object, ignoring it");
                Map::new()
            }
        };

        let bookmarks = match root.remove("bookmarks") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { srs, bookmarks }
    }

    /// Validated SRS entries in stored key order.
    pub fn entries(&self, now: DateTime<Utc>) -> Vec<NormalizedEntry> {
        self.srs
            .iter()
            .filter_map(|(key, value)| normalize_entry(key, value, now))
            .collect()
    }

    pub fn entry(&self, question_id: QuestionId, now: DateTime<Utc>) -> Option<NormalizedEntry> {
        let key = question_id.to_string();
        self.srs
            .get(&key)
            .and_then(|value| normalize_entry(&key, value, now))
    }

    pub fn raw_record(&self, question_id: QuestionId) -> Option<&Value> {
        self.srs.get(&question_id.to_string())
    }

    pub fn set_record(&mut self, question_id: QuestionId, record: &LearningRecord) {
        self.srs.insert(question_id.to_string(), record.to_value());
    }

    /// Order of the remaining entries is kept.
    pub fn remove_record(&mut self, question_id: QuestionId) -> bool {
        let key = question_id.to_string();
        let before = self.srs.len();
        self.srs.retain(|k, _| *k != key);
        self.srs.len() != before
    }

    /// Bookmarked ids in stored order; unparseable entries are skipped.
    pub fn bookmark_ids(&self) -> Vec<QuestionId> {
        self.bookmarks
            .iter()
            .filter_map(|raw| {
                let parsed = parse_question_id(raw);
                if parsed.is_none() {
                    tracing::warn!(bookmark = %raw, "Skipping non-numeric bookmark");
                }
                parsed
            })
            .collect()
    }

    pub fn is_bookmarked(&self, question_id: QuestionId) -> bool {
        self.bookmark_ids().contains(&question_id)
    }

    /// Returns `false` when already present.
    pub fn add_bookmark(&mut self, question_id: QuestionId) -> bool {
        if self.is_bookmarked(question_id) {
            return false;
        }
        self.bookmarks.push(question_id.to_string());
        true
    }

    /// Removes every spelling of the id. Returns `false` when absent.
    pub fn remove_bookmark(&mut self, question_id: QuestionId) -> bool {
        let before = self.bookmarks.len();
        self.bookmarks
            .retain(|raw| parse_question_id(raw) != Some(question_id));
        self.bookmarks.len() != before
    }
}

/// Rewrites numeric keys to their canonical spelling (`" 042"` becomes
/// `"42"`), keeping the first entry when two spellings collide. Keys that are
/// not ids stay as they are and get skipped by [`normalize_entry`].
fn canonicalize_keys(raw: Map<String, Value>) -> Map<String, Value> {
    let mut srs = Map::with_capacity(raw.len());
    for (key, value) in raw {
        let key = match parse_question_id(&key) {
            Some(id) => id.to_string(),
            None => key,
        };
        if srs.contains_key(&key) {
            tracing::warn!(key = %key, "Dropping duplicate SRS entry for the same question");
            continue;
        }
        srs.insert(key, value);
    }
    srs
}

impl Store {
    pub fn get_learner_state(&self, learner_id: &str) -> Result<LearnerState, StoreError> {
        let key = keys::learner_state_key(learner_id)?;
        match self.learner_states.get(key.as_bytes())? {
            Some(raw) => Ok(LearnerState::from_value(Self::deserialize::<Value>(&raw)?)),
            None => Ok(LearnerState::default()),
        }
    }

    pub fn put_learner_state(&self, learner_id: &str, state: &LearnerState) -> Result<(), StoreError> {
        let key = keys::learner_state_key(learner_id)?;
        self.learner_states
            .insert(key.as_bytes(), Self::serialize(state)?)?;
        Ok(())
    }
}
