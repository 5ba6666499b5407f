use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{NormalizedEntry, RecordState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SrsStatistics {
    pub total: usize,
    pub mastered: usize,
    pub in_progress: usize,
    /// Only entries with a readable review date count here.
    pub due_now: usize,
    pub average_difficulty: f64,
}

pub fn summarize(entries: &[NormalizedEntry], now: DateTime<Utc>) -> SrsStatistics {
    let total = entries.len();
    let mastered = entries.iter().filter(|e| e.is_mastered()).count();
    let due_now = entries
        .iter()
        .filter(|e| match &e.state {
            RecordState::Intact(record) => !record.mastered && record.next_review <= now,
            RecordState::Unreadable { .. } => false,
        })
        .count();
    let average_difficulty = if total == 0 {
        0.0
    } else {
        entries.iter().map(NormalizedEntry::difficulty_level).sum::<f64>() / total as f64
    };

    SrsStatistics {
        total,
        mastered,
        in_progress: total - mastered,
        due_now,
        average_difficulty,
    }
}
