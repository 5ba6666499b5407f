//! Weighted review drill: shaky questions show up more than once.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::corpus::QuestionId;

use super::record::{NormalizedEntry, RecordState};

/// `max(1, trunc(wrong_ratio * difficulty * 2))`; unreadable entries weigh 1.
pub fn adaptive_weight(entry: &NormalizedEntry) -> usize {
    match &entry.state {
        RecordState::Intact(record) => {
            let wrong_ratio = record.wrong_count as f64 / record.total_attempts.max(1) as f64;
            ((wrong_ratio * record.difficulty_level * 2.0) as usize).max(1)
        }
        RecordState::Unreadable { .. } => 1,
    }
}

pub fn adaptive_review_list<R: Rng + ?Sized>(
    entries: &[NormalizedEntry],
    rng: &mut R,
) -> Vec<QuestionId> {
    let mut weighted: Vec<QuestionId> = entries
        .iter()
        .filter(|e| !e.is_mastered())
        .flat_map(|e| std::iter::repeat(e.question_id).take(adaptive_weight(e)))
        .collect();
    weighted.shuffle(rng);
    weighted
}

pub fn mastered_ids(entries: &[NormalizedEntry]) -> HashSet<QuestionId> {
    entries
        .iter()
        .filter(|e| e.is_mastered())
        .map(|e| e.question_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::srs::record::LearningRecord;

    fn entry(question_id: QuestionId, wrong: u32, total: u32, difficulty: f64, mastered: bool) -> NormalizedEntry {
        let mut record = LearningRecord::new(Utc::now());
        record.wrong_count = wrong;
        record.total_attempts = total;
        record.difficulty_level = difficulty;
        record.mastered = mastered;
        NormalizedEntry {
            question_id,
            state: RecordState::Intact(record),
        }
    }

    #[test]
    fn weight_scales_with_wrong_ratio_and_difficulty() {
        assert_eq!(adaptive_weight(&entry(1, 3, 4, 8.0, false)), 12);
        assert_eq!(adaptive_weight(&entry(1, 0, 4, 8.0, false)), 1);
        assert_eq!(adaptive_weight(&entry(1, 1, 3, 1.0, false)), 1);
    }

    #[test]
    fn list_skips_mastered_and_repeats_by_weight() {
        let entries = vec![
            entry(1, 2, 2, 10.0, false),
            entry(2, 0, 5, 2.5, true),
            entry(3, 1, 2, 4.0, false),
        ];
        let mut rng = StdRng::seed_from_u64(9);
        let list = adaptive_review_list(&entries, &mut rng);

        assert_eq!(list.iter().filter(|&&id| id == 1).count(), 20);
        assert_eq!(list.iter().filter(|&&id| id == 3).count(), 4);
        assert!(!list.contains(&2));
        assert_eq!(mastered_ids(&entries), HashSet::from([2]));
    }
}
