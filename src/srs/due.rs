use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{BOOKMARK_ONLY_PRIORITY, UNREADABLE_RECORD_PRIORITY};
use crate::corpus::QuestionId;

use super::record::{LearningRecord, NormalizedEntry, RecordState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItem {
    pub question_id: QuestionId,
    pub priority: f64,
}

fn priority_desc(a: &DueItem, b: &DueItem) -> Ordering {
    b.priority.partial_cmp(&a.priority).unwrap_or(Ordering::Equal)
}

/// `wrong_ratio * 100 + days_overdue + difficulty_level`.
pub fn review_priority(record: &LearningRecord, now: DateTime<Utc>) -> f64 {
    let wrong_ratio = record.wrong_count as f64 / record.total_attempts.max(1) as f64;
    let days_overdue = (now - record.next_review).num_days().max(0) as f64;
    wrong_ratio * 100.0 + days_overdue + record.difficulty_level
}

/// Scores every due id, highest priority first.
///
/// `entries` must be in the learner's stored order; ties keep that order,
/// with bookmarks that had no record following in bookmark order.
pub fn resolve_scored(
    entries: &[NormalizedEntry],
    bookmarks: &[QuestionId],
    now: DateTime<Utc>,
) -> Vec<DueItem> {
    let bookmarked: HashSet<QuestionId> = bookmarks.iter().copied().collect();
    let mut emitted = HashSet::with_capacity(entries.len() + bookmarks.len());
    let mut due = Vec::new();

    for entry in entries {
        let is_bookmarked = bookmarked.contains(&entry.question_id);
        let priority = match &entry.state {
            RecordState::Intact(record) if record.mastered => {
                is_bookmarked.then_some(BOOKMARK_ONLY_PRIORITY)
            }
            RecordState::Intact(record) => (is_bookmarked || record.next_review <= now)
                .then(|| review_priority(record, now)),
            RecordState::Unreadable { mastered: true, .. } => {
                is_bookmarked.then_some(BOOKMARK_ONLY_PRIORITY)
            }
            RecordState::Unreadable { .. } => Some(UNREADABLE_RECORD_PRIORITY),
        };

        if let Some(priority) = priority {
            if emitted.insert(entry.question_id) {
                due.push(DueItem {
                    question_id: entry.question_id,
                    priority,
                });
            }
        }
    }

    for &question_id in bookmarks {
        if emitted.insert(question_id) {
            due.push(DueItem {
                question_id,
                priority: BOOKMARK_ONLY_PRIORITY,
            });
        }
    }

    due.sort_by(priority_desc);
    due
}

pub fn resolve(
    entries: &[NormalizedEntry],
    bookmarks: &[QuestionId],
    now: DateTime<Utc>,
) -> Vec<QuestionId> {
    resolve_scored(entries, bookmarks, now)
        .into_iter()
        .map(|item| item.question_id)
        .collect()
}

/// Same as [`resolve`], cut to `max_count` after sorting.
pub fn resolve_bounded(
    entries: &[NormalizedEntry],
    bookmarks: &[QuestionId],
    now: DateTime<Utc>,
    max_count: usize,
) -> Vec<QuestionId> {
    let mut due = resolve(entries, bookmarks, now);
    due.truncate(max_count);
    due
}
