use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

use super::{Corpus, CorpusError, QuestionSource};

#[derive(Debug, Clone)]
struct CachedCorpus {
    corpus: Arc<Corpus>,
    inserted_at: DateTime<Utc>,
}

/// Explicit TTL cache in front of a [`QuestionSource`].
pub struct CorpusCache {
    source: Arc<dyn QuestionSource>,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<CachedCorpus>>,
}

impl CorpusCache {
    pub fn new(source: Arc<dyn QuestionSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached corpus if younger than `ttl`, reloading otherwise.
    ///
    /// A failed reload keeps serving the stale snapshot when one exists.
    pub fn get_or_refresh(&self, ttl: Duration) -> Result<Arc<Corpus>, CorpusError> {
        let now = self.clock.now();

        {
            let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = slot.as_ref() {
                if now - cached.inserted_at < ttl {
                    return Ok(cached.corpus.clone());
                }
            }
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have refreshed while we waited for the write lock.
        if let Some(cached) = slot.as_ref() {
            if now - cached.inserted_at < ttl {
                return Ok(cached.corpus.clone());
            }
        }

        match self.source.load() {
            Ok(questions) => {
                let corpus = Arc::new(Corpus::new(questions));
                tracing::debug!(count = corpus.len(), "Question corpus cache refreshed");
                *slot = Some(CachedCorpus {
                    corpus: corpus.clone(),
                    inserted_at: now,
                });
                Ok(corpus)
            }
            Err(error) => match slot.as_ref() {
                Some(stale) => {
                    tracing::warn!(error = %error, "Corpus reload failed, serving stale snapshot");
                    Ok(stale.corpus.clone())
                }
                None => Err(error),
            },
        }
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn inserted_at(&self) -> Option<DateTime<Utc>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|cached| cached.inserted_at)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualClock;
    use crate::corpus::{Question, QuestionType};

    struct CountingSource {
        loads: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    impl QuestionSource for CountingSource {
        fn load(&self) -> Result<Vec<Question>, CorpusError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CorpusError::Io {
                    path: "mock".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                });
            }
            let n = self.loads.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(vec![Question {
                id: n,
                question_type: QuestionType::Basic,
                category: "共通".to_string(),
                department: None,
                year: None,
                content: Default::default(),
            }])
        }
    }

    #[test]
    fn serves_cached_until_ttl_expires() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = CorpusCache::new(source.clone(), clock.clone());
        let ttl = Duration::seconds(60);

        let first = cache.get_or_refresh(ttl).unwrap();
        clock.advance(Duration::seconds(59));
        let second = cache.get_or_refresh(ttl).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        clock.advance(Duration::seconds(1));
        let third = cache.get_or_refresh(ttl).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_reload_serves_stale_snapshot() {
        let source = Arc::new(CountingSource::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = CorpusCache::new(source.clone(), clock.clone());
        let ttl = Duration::seconds(10);

        let first = cache.get_or_refresh(ttl).unwrap();
        source.fail.store(true, Ordering::SeqCst);
        clock.advance(Duration::seconds(30));

        let stale = cache.get_or_refresh(ttl).unwrap();
        assert!(Arc::ptr_eq(&first, &stale));
    }

    #[test]
    fn failed_first_load_is_an_error() {
        let source = Arc::new(CountingSource::new());
        source.fail.store(true, Ordering::SeqCst);
        let cache = CorpusCache::new(source, Arc::new(ManualClock::new(Utc::now())));
        assert!(cache.get_or_refresh(Duration::seconds(10)).is_err());
    }

    #[test]
    fn invalidate_forces_reload() {
        let source = Arc::new(CountingSource::new());
        let cache = CorpusCache::new(source.clone(), Arc::new(ManualClock::new(Utc::now())));
        let ttl = Duration::hours(1);

        cache.get_or_refresh(ttl).unwrap();
        cache.invalidate();
        assert!(cache.inserted_at().is_none());
        cache.get_or_refresh(ttl).unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }
}
