//! Learner-facing operations over persisted state, the corpus and the clock.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::corpus::{Corpus, CorpusCache, CorpusError, Question, QuestionId};
use crate::store::operations::history::AnswerRecord;
use crate::store::operations::learner_state::LearnerState;
use crate::store::{Store, StoreError};

use super::adaptive;
use super::composer::{self, SessionFilter};
use super::due::{self, DueItem};
use super::locks::LearnerLocks;
use super::record::LearningRecord;
use super::scheduler;
use super::statistics::{self, SrsStatistics};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

const MAX_CORPUS_CACHE_TTL_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub questions_per_session: u32,
    pub max_review_ratio: f64,
    pub due_review_limit: usize,
    pub lock_table_high_water: usize,
    pub corpus_cache_ttl: chrono::Duration,
}

impl From<&SessionConfig> for EngineSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            questions_per_session: config.questions_per_session,
            max_review_ratio: config.max_review_ratio,
            due_review_limit: config.due_review_limit,
            lock_table_high_water: config.lock_table_high_water,
            corpus_cache_ttl: chrono::Duration::seconds(
                config.corpus_cache_ttl_secs.min(MAX_CORPUS_CACHE_TTL_SECS) as i64,
            ),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

pub struct ExamEngine {
    store: Arc<Store>,
    corpus: Arc<CorpusCache>,
    locks: LearnerLocks,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl ExamEngine {
    pub fn new(
        store: Arc<Store>,
        corpus: Arc<CorpusCache>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            corpus,
            locks: LearnerLocks::new(settings.lock_table_high_water),
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn corpus(&self) -> Result<Arc<Corpus>, CorpusError> {
        self.corpus.get_or_refresh(self.settings.corpus_cache_ttl)
    }

    pub fn locked_learners(&self) -> usize {
        self.locks.len()
    }

    /// A filter carrying the configured session size and review ratio.
    pub fn default_filter(&self) -> SessionFilter {
        SessionFilter::new(self.settings.questions_per_session)
            .with_max_review_ratio(self.settings.max_review_ratio)
    }

    /// Records one answer and reschedules the question.
    ///
    /// The SRS update and the history entry are written in one transaction
    /// under the learner's lock. A damaged stored entry is salvaged first.
    pub fn apply_outcome(
        &self,
        learner_id: &str,
        question_id: QuestionId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<LearningRecord, EngineError> {
        // Tags for the history entry are best effort; answering never
        // depends on the corpus being loadable.
        let question = match self.corpus() {
            Ok(corpus) => corpus.get(question_id).cloned(),
            Err(error) => {
                tracing::warn!(error = %error, "Corpus unavailable, answer stored without tags");
                None
            }
        };

        let record = self.locks.with_learner(learner_id, || {
            let mut state = self.store.get_learner_state(learner_id)?;
            let prior = state
                .raw_record(question_id)
                .map(|value| LearningRecord::salvage(value, now));
            let record = scheduler::apply_outcome(prior, is_correct, now);
            state.set_record(question_id, &record);

            let answer = AnswerRecord {
                id: uuid::Uuid::new_v4().to_string(),
                learner_id: learner_id.to_string(),
                question_id,
                is_correct,
                category: question.as_ref().map(|q| q.category.clone()),
                department: question.as_ref().and_then(|q| q.department.clone()),
                question_type: question.as_ref().map(|q| q.question_type),
                answered_at: now,
            };
            self.store.save_answer(learner_id, &state, &answer)?;
            Ok::<_, EngineError>(record)
        })?;

        tracing::info!(
            learner_id,
            question_id,
            is_correct,
            correct_count = record.correct_count,
            wrong_count = record.wrong_count,
            mastered = record.mastered,
            interval_days = record.interval_days,
            "Answer applied"
        );
        Ok(record)
    }

    /// Composes a session and returns its question ids.
    pub fn compose_session(
        &self,
        learner_id: &str,
        filter: &SessionFilter,
    ) -> Result<Vec<QuestionId>, EngineError> {
        let questions =
            self.compose_session_with(learner_id, filter, &HashSet::new(), &mut rand::thread_rng())?;
        Ok(questions.into_iter().map(|q| q.id).collect())
    }

    pub fn compose_session_with<R: Rng + ?Sized>(
        &self,
        learner_id: &str,
        filter: &SessionFilter,
        already_selected: &HashSet<QuestionId>,
        rng: &mut R,
    ) -> Result<Vec<Question>, EngineError> {
        let corpus = self.corpus()?;
        let now = self.clock.now();
        let state = self.load_state(learner_id)?;

        let due_ids = due::resolve_bounded(
            &state.entries(now),
            &state.bookmark_ids(),
            now,
            self.settings.due_review_limit,
        );
        let session = composer::compose(filter, &due_ids, &corpus, already_selected, rng);

        tracing::info!(
            learner_id,
            due = due_ids.len(),
            size = session.len(),
            target = filter.target_size(),
            "Session composed for learner"
        );
        Ok(session)
    }

    /// Due ids with their scores, bounded by the configured limit.
    pub fn due_reviews(&self, learner_id: &str) -> Result<Vec<DueItem>, EngineError> {
        let now = self.clock.now();
        let state = self.load_state(learner_id)?;
        let mut due = due::resolve_scored(&state.entries(now), &state.bookmark_ids(), now);
        due.truncate(self.settings.due_review_limit);
        Ok(due)
    }

    pub fn get_statistics(&self, learner_id: &str) -> Result<SrsStatistics, EngineError> {
        let now = self.clock.now();
        let state = self.load_state(learner_id)?;
        Ok(statistics::summarize(&state.entries(now), now))
    }

    /// Drops the question's record. `false` when there was nothing to drop.
    pub fn reset_record(&self, learner_id: &str, question_id: QuestionId) -> Result<bool, EngineError> {
        let removed = self.mutate_state(learner_id, |state| state.remove_record(question_id))?;
        if removed {
            tracing::info!(learner_id, question_id, "SRS record reset");
        }
        Ok(removed)
    }

    /// `None` when absent or unreadable.
    pub fn get_record(
        &self,
        learner_id: &str,
        question_id: QuestionId,
    ) -> Result<Option<LearningRecord>, EngineError> {
        let state = self.load_state(learner_id)?;
        Ok(state
            .entry(question_id, self.clock.now())
            .and_then(|entry| entry.record().cloned()))
    }

    pub fn bookmarks(&self, learner_id: &str) -> Result<Vec<QuestionId>, EngineError> {
        Ok(self.load_state(learner_id)?.bookmark_ids())
    }

    pub fn add_bookmark(&self, learner_id: &str, question_id: QuestionId) -> Result<bool, EngineError> {
        self.mutate_state(learner_id, |state| state.add_bookmark(question_id))
    }

    pub fn remove_bookmark(&self, learner_id: &str, question_id: QuestionId) -> Result<bool, EngineError> {
        self.mutate_state(learner_id, |state| state.remove_bookmark(question_id))
    }

    /// Removes bookmarks whose question is already mastered.
    pub fn cleanup_mastered_bookmarks(&self, learner_id: &str) -> Result<usize, EngineError> {
        let now = self.clock.now();
        let removed = self.mutate_state(learner_id, |state| {
            let mastered = adaptive::mastered_ids(&state.entries(now));
            state
                .bookmark_ids()
                .into_iter()
                .filter(|id| mastered.contains(id))
                .filter(|id| state.remove_bookmark(*id))
                .count()
        })?;
        if removed > 0 {
            tracing::info!(learner_id, removed, "Removed mastered bookmarks");
        }
        Ok(removed)
    }

    pub fn adaptive_review_list(&self, learner_id: &str) -> Result<Vec<QuestionId>, EngineError> {
        self.adaptive_review_list_with(learner_id, &mut rand::thread_rng())
    }

    pub fn adaptive_review_list_with<R: Rng + ?Sized>(
        &self,
        learner_id: &str,
        rng: &mut R,
    ) -> Result<Vec<QuestionId>, EngineError> {
        let now = self.clock.now();
        let state = self.load_state(learner_id)?;
        Ok(adaptive::adaptive_review_list(&state.entries(now), rng))
    }

    pub fn history(&self, learner_id: &str, limit: usize) -> Result<Vec<AnswerRecord>, EngineError> {
        Ok(self.store.list_answers(learner_id, limit)?)
    }

    // Single-key sled reads are atomic, so read-only paths skip the learner lock.
    fn load_state(&self, learner_id: &str) -> Result<LearnerState, EngineError> {
        Ok(self.store.get_learner_state(learner_id)?)
    }

    /// Read-modify-write under the learner lock; writes back only on change.
    fn mutate_state<T>(
        &self,
        learner_id: &str,
        f: impl FnOnce(&mut LearnerState) -> T,
    ) -> Result<T, EngineError> {
        self.locks.with_learner(learner_id, || {
            let mut state = self.store.get_learner_state(learner_id)?;
            let before = state.clone();
            let result = f(&mut state);
            if state != before {
                self.store.put_learner_state(learner_id, &state)?;
            }
            Ok::<_, EngineError>(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;
    use crate::corpus::{QuestionType, StaticSource};

    struct Harness {
        _dir: TempDir,
        store: Arc<Store>,
        clock: Arc<ManualClock>,
        engine: ExamEngine,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 7, 30, 0).unwrap()
    }

    fn harness() -> Harness {
        let mut questions = Vec::new();
        for id in 1..=30 {
            questions.push(Question {
                id,
                question_type: QuestionType::Basic,
                category: "共通".to_string(),
                department: None,
                year: None,
                content: Default::default(),
            });
        }
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db").to_str().unwrap()).unwrap());
        store.run_migrations().unwrap();
        let clock = Arc::new(ManualClock::new(t0()));
        let corpus = Arc::new(CorpusCache::new(
            Arc::new(StaticSource::new(questions)),
            clock.clone(),
        ));
        let engine = ExamEngine::new(store.clone(), corpus, clock.clone(), EngineSettings::default());
        Harness {
            _dir: dir,
            store,
            clock,
            engine,
        }
    }

    #[test]
    fn answers_persist_and_append_history() {
        let h = harness();
        for _ in 0..3 {
            h.engine.apply_outcome("alice", 101, false, t0()).unwrap();
        }

        let record = h.engine.get_record("alice", 101).unwrap().unwrap();
        assert_eq!(record.wrong_count, 3);
        assert_eq!(record.difficulty_level, 8.0);
        assert_eq!(record.next_review, t0() + Duration::days(1));

        let history = h.engine.history("alice", 10).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|a| !a.is_correct && a.category.is_none()));
    }

    #[test]
    fn damaged_entry_heals_on_next_answer() {
        let h = harness();
        let mut state = LearnerState::default();
        state
            .srs
            .insert("5".to_string(), json!({ "wrong_count": 2, "next_review": "garbled" }));
        h.store.put_learner_state("alice", &state).unwrap();

        assert!(h.engine.get_record("alice", 5).unwrap().is_none());
        let record = h.engine.apply_outcome("alice", 5, false, t0()).unwrap();
        assert_eq!(record.wrong_count, 3);
        assert_eq!(record.total_attempts, 1);
        assert_eq!(record.difficulty_level, 6.0);
        assert!(h.engine.get_record("alice", 5).unwrap().is_some());
    }

    #[test]
    fn three_due_reviews_fill_ten_slots() {
        let h = harness();
        for id in [4, 8, 15] {
            h.engine.apply_outcome("alice", id, false, t0()).unwrap();
        }
        h.clock.advance(Duration::days(2));

        let filter = SessionFilter::new(10).with_max_review_ratio(0.5);
        let mut rng = StdRng::seed_from_u64(42);
        let session = h
            .engine
            .compose_session_with("alice", &filter, &HashSet::new(), &mut rng)
            .unwrap();

        assert_eq!(session.len(), 10);
        for id in [4, 8, 15] {
            assert!(session.iter().any(|q| q.id == id));
        }
    }

    #[test]
    fn compose_session_returns_due_ids_plus_fresh_ones() {
        let h = harness();
        for id in [4, 8, 15] {
            h.engine.apply_outcome("alice", id, false, t0()).unwrap();
        }
        h.clock.advance(Duration::days(2));

        let ids = h.engine.compose_session("alice", &SessionFilter::new(10)).unwrap();

        assert_eq!(ids.len(), 10);
        let unique: HashSet<QuestionId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 10);
        for id in [4, 8, 15] {
            assert!(unique.contains(&id), "due id {id} missing from {ids:?}");
        }
        assert_eq!(unique.iter().filter(|id| ![4, 8, 15].contains(*id)).count(), 7);
        assert!(ids.iter().all(|id| (1..=30).contains(id)));
    }

    #[test]
    fn due_ties_follow_first_answer_order() {
        let h = harness();
        h.engine.apply_outcome("alice", 9, false, t0()).unwrap();
        h.engine.apply_outcome("alice", 10, false, t0()).unwrap();
        h.clock.advance(Duration::days(2));

        let due: Vec<QuestionId> = h
            .engine
            .due_reviews("alice")
            .unwrap()
            .iter()
            .map(|item| item.question_id)
            .collect();
        assert_eq!(due, vec![9, 10]);

        // Re-answering keeps the entry's place.
        h.engine.apply_outcome("alice", 9, false, t0()).unwrap();
        h.engine.apply_outcome("alice", 10, false, t0()).unwrap();
        let due: Vec<QuestionId> = h
            .engine
            .due_reviews("alice")
            .unwrap()
            .iter()
            .map(|item| item.question_id)
            .collect();
        assert_eq!(due, vec![9, 10]);
    }

    #[test]
    fn statistics_are_stable_between_reads() {
        let h = harness();
        h.engine.apply_outcome("alice", 1, true, t0()).unwrap();
        h.engine.apply_outcome("alice", 2, false, t0()).unwrap();
        h.clock.advance(Duration::days(1));

        let first = h.engine.get_statistics("alice").unwrap();
        let second = h.engine.get_statistics("alice").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total, 2);
        assert_eq!(first.due_now, 1);
        assert_eq!(first.average_difficulty, 5.25);
    }

    #[test]
    fn reset_is_idempotent() {
        let h = harness();
        h.engine.apply_outcome("alice", 9, true, t0()).unwrap();
        assert!(h.engine.reset_record("alice", 9).unwrap());
        assert!(!h.engine.reset_record("alice", 9).unwrap());
        assert!(h.engine.get_record("alice", 9).unwrap().is_none());
    }

    #[test]
    fn mastered_bookmarks_are_cleaned_up() {
        let h = harness();
        for _ in 0..5 {
            h.engine.apply_outcome("alice", 3, true, t0()).unwrap();
        }
        h.engine.apply_outcome("alice", 4, false, t0()).unwrap();
        assert!(h.engine.add_bookmark("alice", 3).unwrap());
        assert!(h.engine.add_bookmark("alice", 4).unwrap());
        assert!(!h.engine.add_bookmark("alice", 4).unwrap());

        assert_eq!(h.engine.cleanup_mastered_bookmarks("alice").unwrap(), 1);
        assert_eq!(h.engine.bookmarks("alice").unwrap(), vec![4]);
        assert_eq!(h.engine.cleanup_mastered_bookmarks("alice").unwrap(), 0);
    }

    #[test]
    fn invalid_learner_id_is_a_store_validation_error() {
        let h = harness();
        let err = h.engine.get_statistics("bad:id").unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::Validation(_))));
    }
}
