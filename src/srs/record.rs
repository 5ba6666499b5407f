//! Learning records and the one place persisted SRS entries get validated.
//!
//! Persisted state is JSON that may predate the current schema or have been
//! damaged in transit. [`normalize_entry`] is the fail-open boundary: it turns
//! every entry into either an intact [`LearningRecord`] or an explicit
//! [`RecordState::Unreadable`] marker, so nothing downstream ever touches raw
//! JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::corpus::QuestionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub correct_count: u32,
    pub wrong_count: u32,
    pub total_attempts: u32,
    pub difficulty_level: f64,
    pub mastered: bool,
    pub next_review: DateTime<Utc>,
    /// Last computed interval. Written for auditing, never read back.
    pub interval_days: u32,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
}

impl LearningRecord {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            correct_count: 0,
            wrong_count: 0,
            total_attempts: 0,
            difficulty_level: DEFAULT_DIFFICULTY,
            mastered: false,
            next_review: now,
            interval_days: 1,
            first_attempt: now,
            last_attempt: now,
        }
    }

    /// Strict decode: `None` when any field the scheduler reads is missing or
    /// unreadable. Timestamps that are only informational default to `now`.
    pub fn from_value(value: &Value, now: DateTime<Utc>) -> Option<Self> {
        let obj = value.as_object()?;
        let difficulty_level = obj.get("difficulty_level")?.as_f64()?;
        if !difficulty_level.is_finite() {
            return None;
        }

        Some(Self {
            correct_count: read_count(obj.get("correct_count"))?,
            wrong_count: read_count(obj.get("wrong_count"))?,
            total_attempts: read_count(obj.get("total_attempts"))?,
            difficulty_level: difficulty_level.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            mastered: obj.get("mastered").and_then(Value::as_bool).unwrap_or(false),
            next_review: obj.get("next_review").and_then(parse_timestamp)?,
            interval_days: obj
                .get("interval_days")
                .and_then(|v| read_count(Some(v)))
                .unwrap_or(1),
            first_attempt: obj
                .get("first_attempt")
                .and_then(parse_timestamp)
                .unwrap_or(now),
            last_attempt: obj
                .get("last_attempt")
                .and_then(parse_timestamp)
                .unwrap_or(now),
        })
    }

    /// Lenient decode used before writing: keeps whatever is readable and
    /// fills the rest with fresh-record defaults.
    pub fn salvage(value: &Value, now: DateTime<Utc>) -> Self {
        if let Some(intact) = Self::from_value(value, now) {
            return intact;
        }

        let mut record = Self::new(now);
        let Some(obj) = value.as_object() else {
            return record;
        };

        record.correct_count = read_count(obj.get("correct_count")).unwrap_or(0);
        record.wrong_count = read_count(obj.get("wrong_count")).unwrap_or(0);
        record.total_attempts = read_count(obj.get("total_attempts")).unwrap_or(0);
        record.difficulty_level = obj
            .get("difficulty_level")
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite())
            .unwrap_or(DEFAULT_DIFFICULTY)
            .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        record.mastered = obj.get("mastered").and_then(Value::as_bool).unwrap_or(false);
        if let Some(at) = obj.get("next_review").and_then(parse_timestamp) {
            record.next_review = at;
        }
        if let Some(days) = obj.get("interval_days").and_then(|v| read_count(Some(v))) {
            record.interval_days = days;
        }
        if let Some(at) = obj.get("first_attempt").and_then(parse_timestamp) {
            record.first_attempt = at;
        }
        if let Some(at) = obj.get("last_attempt").and_then(parse_timestamp) {
            record.last_attempt = at;
        }
        record
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Intact(LearningRecord),
    /// Entry is an object but the schedule cannot be read. Treated as due.
    Unreadable {
        mastered: bool,
        difficulty_level: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEntry {
    pub question_id: QuestionId,
    pub state: RecordState,
}

impl NormalizedEntry {
    pub fn is_mastered(&self) -> bool {
        match &self.state {
            RecordState::Intact(record) => record.mastered,
            RecordState::Unreadable { mastered, .. } => *mastered,
        }
    }

    pub fn difficulty_level(&self) -> f64 {
        match &self.state {
            RecordState::Intact(record) => record.difficulty_level,
            RecordState::Unreadable {
                difficulty_level, ..
            } => difficulty_level.unwrap_or(DEFAULT_DIFFICULTY),
        }
    }

    pub fn record(&self) -> Option<&LearningRecord> {
        match &self.state {
            RecordState::Intact(record) => Some(record),
            RecordState::Unreadable { .. } => None,
        }
    }
}

/// Validates one persisted SRS entry.
///
/// Returns `None` for entries that cannot be attributed to a question at all
/// (non-numeric key, non-object value); those are skipped everywhere.
pub fn normalize_entry(key: &str, value: &Value, now: DateTime<Utc>) -> Option<NormalizedEntry> {
    let Some(question_id) = parse_question_id(key) else {
        tracing::warn!(key, "Skipping SRS entry with non-numeric question id");
        return None;
    };

    let Some(obj) = value.as_object() else {
        tracing::warn!(question_id, "Skipping SRS entry that is not an object");
        return None;
    };

    let state = match LearningRecord::from_value(value, now) {
        Some(record) => RecordState::Intact(record),
        None => {
            tracing::debug!(question_id, "SRS entry unreadable, treating as due");
            RecordState::Unreadable {
                mastered: obj.get("mastered").and_then(Value::as_bool).unwrap_or(false),
                difficulty_level: obj
                    .get("difficulty_level")
                    .and_then(Value::as_f64)
                    .filter(|d| d.is_finite())
                    .map(|d| d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)),
            }
        }
    };

    Some(NormalizedEntry { question_id, state })
}

pub fn parse_question_id(raw: &str) -> Option<QuestionId> {
    raw.trim().parse().ok()
}

/// Accepts RFC 3339 as well as naive ISO 8601 (read as UTC).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn read_count(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    // Older writers stored counts as floats.
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32)
}
