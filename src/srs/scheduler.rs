use chrono::{DateTime, Duration, Utc};

use crate::constants::{
    BASE_INTERVALS, DIFFICULTY_STEP_CORRECT, DIFFICULTY_STEP_WRONG, MASTERY_THRESHOLD,
    MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_DIFFICULTY_FACTOR, WRONG_ANSWER_PENALTY,
};

use super::record::LearningRecord;

/// Review interval in whole days, computed from the answer counts alone.
pub fn review_interval_days(correct_count: u32, wrong_count: u32) -> u32 {
    let mastery_level = (correct_count as usize).min(BASE_INTERVALS.len() - 1);
    let difficulty_factor =
        (1.0 - wrong_count as f64 * WRONG_ANSWER_PENALTY).max(MIN_DIFFICULTY_FACTOR);
    let adjusted = (BASE_INTERVALS[mastery_level] as f64 * difficulty_factor).round();
    (adjusted as u32).max(1)
}

pub fn next_review(correct_count: u32, wrong_count: u32, now: DateTime<Utc>) -> (DateTime<Utc>, u32) {
    let days = review_interval_days(correct_count, wrong_count);
    (now + Duration::days(i64::from(days)), days)
}

/// Folds one answer into a record, creating it on first contact.
pub fn apply_outcome(
    record: Option<LearningRecord>,
    is_correct: bool,
    now: DateTime<Utc>,
) -> LearningRecord {
    let mut record = record.unwrap_or_else(|| LearningRecord::new(now));

    record.total_attempts = record.total_attempts.saturating_add(1);
    record.last_attempt = now;

    if is_correct {
        record.correct_count = record.correct_count.saturating_add(1);
        record.difficulty_level =
            (record.difficulty_level - DIFFICULTY_STEP_CORRECT).max(MIN_DIFFICULTY);
        if record.correct_count >= MASTERY_THRESHOLD {
            record.mastered = true;
        }
    } else {
        record.wrong_count = record.wrong_count.saturating_add(1);
        record.difficulty_level =
            (record.difficulty_level + DIFFICULTY_STEP_WRONG).min(MAX_DIFFICULTY);
        record.mastered = false;
    }

    // Mastered records keep whatever schedule they had.
    if !record.mastered {
        let (at, days) = next_review(record.correct_count, record.wrong_count, now);
        record.next_review = at;
        record.interval_days = days;
    }

    record
}
