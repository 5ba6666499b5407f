//! Session composition: due reviews blended with fresh questions.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::{ALL_CATEGORIES, ALL_CATEGORIES_JA, DEFAULT_MAX_REVIEW_RATIO};
use crate::corpus::{departments, Corpus, Question, QuestionId, QuestionType};

/// Active constraints for one composition request. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFilter {
    department: Option<String>,
    question_type: Option<QuestionType>,
    category: Option<String>,
    year: Option<String>,
    target_size: u32,
    max_review_ratio: f64,
}

impl SessionFilter {
    pub fn new(target_size: u32) -> Self {
        Self {
            department: None,
            question_type: None,
            category: None,
            year: None,
            target_size,
            max_review_ratio: DEFAULT_MAX_REVIEW_RATIO,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = non_blank(department.into());
        self
    }

    pub fn with_question_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = Some(question_type);
        self
    }

    /// `ALL` (or `全体`) clears the category constraint.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_blank(category.into())
            .filter(|c| c != ALL_CATEGORIES && c != ALL_CATEGORIES_JA);
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = non_blank(year.into());
        self
    }

    /// Clamped into `[0, 1]`; NaN falls back to the default ratio.
    pub fn with_max_review_ratio(mut self, ratio: f64) -> Self {
        self.max_review_ratio = if ratio.is_nan() {
            DEFAULT_MAX_REVIEW_RATIO
        } else {
            ratio.clamp(0.0, 1.0)
        };
        self
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn question_type(&self) -> Option<QuestionType> {
        self.question_type
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn max_review_ratio(&self) -> f64 {
        self.max_review_ratio
    }

    pub fn max_review_count(&self, due_len: usize) -> usize {
        let budget = (self.target_size as f64 * self.max_review_ratio).floor() as usize;
        budget.min(due_len)
    }

    /// Exact-match check used for review candidates.
    pub fn admits_review(&self, question: &Question) -> bool {
        if let Some(department) = self.department() {
            let tagged = question.department.as_deref() == Some(department);
            if !tagged && question.category != departments::category_for(department) {
                return false;
            }
        }
        if let Some(question_type) = self.question_type {
            if question.question_type != question_type {
                return false;
            }
        }
        if let Some(category) = self.category() {
            if question.category != category {
                return false;
            }
        }
        if let Some(year) = self.year() {
            if question.year.as_deref() != Some(year) {
                return false;
            }
        }
        true
    }
}

fn non_blank(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// New-question candidates for `filter`, in corpus order.
pub fn candidate_pool<'a>(filter: &SessionFilter, corpus: &'a Corpus) -> Vec<&'a Question> {
    let mut pool: Vec<&Question> = corpus.questions().iter().collect();

    match filter.question_type() {
        Some(QuestionType::Basic) => {
            pool.retain(|q| q.question_type == QuestionType::Basic && !q.has_year());
        }
        Some(QuestionType::Specialist) => {
            pool.retain(|q| q.question_type == QuestionType::Specialist && q.has_year());
            if let Some(department) = filter.department() {
                let target = departments::category_for(department);
                let matched: Vec<&Question> =
                    pool.iter().copied().filter(|q| q.category == target).collect();
                if matched.is_empty() {
                    tracing::warn!(
                        department,
                        category = target,
                        "No specialist questions for department category, using all specialist questions"
                    );
                } else {
                    pool = matched;
                }
            }
        }
        None => {
            if let Some(department) = filter.department() {
                pool.retain(|q| q.department.as_deref() == Some(department));
            }
        }
    }

    if let Some(category) = filter.category() {
        let exact: Vec<&Question> = pool.iter().copied().filter(|q| q.category == category).collect();
        pool = if exact.is_empty() {
            let fuzzy: Vec<&Question> = pool
                .iter()
                .copied()
                .filter(|q| departments::synonym_matches(&q.category, category))
                .collect();
            tracing::debug!(category, matched = fuzzy.len(), "Category synonym fallback applied");
            fuzzy
        } else {
            exact
        };
    }

    if let Some(year) = filter.year() {
        pool.retain(|q| {
            q.question_type == QuestionType::Specialist && q.year.as_deref() == Some(year)
        });
    }

    pool
}

/// Builds one shuffled session.
///
/// Never returns duplicates or ids from `already_selected`; returns fewer than
/// `target_size` questions when the candidates run out.
pub fn compose<R: Rng + ?Sized>(
    filter: &SessionFilter,
    due_ids: &[QuestionId],
    corpus: &Corpus,
    already_selected: &HashSet<QuestionId>,
    rng: &mut R,
) -> Vec<Question> {
    let target = filter.target_size() as usize;
    if target == 0 || corpus.is_empty() {
        return Vec::new();
    }

    let max_review_count = filter.max_review_count(due_ids.len());
    let mut taken: HashSet<QuestionId> = HashSet::with_capacity(target);
    let mut session: Vec<Question> = Vec::with_capacity(target);

    for &id in due_ids {
        if session.len() >= max_review_count {
            break;
        }
        let Some(question) = corpus.get(id) else {
            continue;
        };
        if already_selected.contains(&id) || !filter.admits_review(question) {
            continue;
        }
        if taken.insert(id) {
            session.push(question.clone());
        }
    }
    let review_count = session.len();

    let mut fresh: Vec<&Question> = candidate_pool(filter, corpus)
        .into_iter()
        .filter(|q| !taken.contains(&q.id) && !already_selected.contains(&q.id))
        .collect();
    fresh.shuffle(rng);
    session.extend(
        fresh
            .into_iter()
            .take(target.saturating_sub(review_count))
            .cloned(),
    );

    session.shuffle(rng);

    tracing::debug!(
        reviews = review_count,
        fresh = session.len() - review_count,
        target,
        "Session composed"
    );
    session
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn question(id: QuestionId, question_type: QuestionType, category: &str, year: Option<&str>) -> Question {
        Question {
            id,
            question_type,
            category: category.to_string(),
            department: None,
            year: year.map(str::to_string),
            content: Default::default(),
        }
    }

    fn mixed_corpus() -> Corpus {
        let mut questions = Vec::new();
        for id in 1..=20 {
            questions.push(question(id, QuestionType::Basic, "共通", None));
        }
        for id in 101..=110 {
            questions.push(question(id, QuestionType::Specialist, "道路", Some("2019")));
        }
        for id in 201..=205 {
            questions.push(question(id, QuestionType::Specialist, "トンネル", Some("2020")));
        }
        Corpus::new(questions)
    }

    fn ids(session: &[Question]) -> Vec<QuestionId> {
        session.iter().map(|q| q.id).collect()
    }

    #[test]
    fn ratio_is_clamped_and_nan_defaults() {
        assert_eq!(SessionFilter::new(10).with_max_review_ratio(3.0).max_review_ratio(), 1.0);
        assert_eq!(SessionFilter::new(10).with_max_review_ratio(-1.0).max_review_ratio(), 0.0);
        assert_eq!(
            SessionFilter::new(10).with_max_review_ratio(f64::NAN).max_review_ratio(),
            DEFAULT_MAX_REVIEW_RATIO
        );
    }

    #[test]
    fn all_category_means_no_filter() {
        assert!(SessionFilter::new(5).with_category("ALL").category().is_none());
        assert!(SessionFilter::new(5).with_category("全体").category().is_none());
        assert_eq!(SessionFilter::new(5).with_category("道路").category(), Some("道路"));
    }

    #[test]
    fn three_due_plus_seven_new() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(10).with_question_type(QuestionType::Basic);
        let due = vec![3, 7, 11];
        let mut rng = StdRng::seed_from_u64(7);

        let session = compose(&filter, &due, &corpus, &HashSet::new(), &mut rng);
        let got = ids(&session);

        assert_eq!(got.len(), 10);
        for id in &due {
            assert!(got.contains(id));
        }
        let unique: HashSet<_> = got.iter().collect();
        assert_eq!(unique.len(), 10);
        assert!(session.iter().all(|q| q.question_type == QuestionType::Basic));
    }

    #[test]
    fn review_budget_caps_reviews() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(4).with_max_review_ratio(0.5);
        let due = vec![1, 2, 3, 4, 5];
        let mut rng = StdRng::seed_from_u64(1);

        let session = compose(&filter, &due, &corpus, &HashSet::new(), &mut rng);
        // Reviews 1 and 2 are always in; the other two come from the fresh pool.
        let got = ids(&session);
        assert_eq!(got.len(), 4);
        assert!(got.contains(&1) && got.contains(&2));
    }

    #[test]
    fn filtered_out_reviews_do_not_use_budget() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(4)
            .with_question_type(QuestionType::Specialist)
            .with_department("road");
        // 5 is basic, 999 is not in the corpus; both are skipped.
        let due = vec![5, 999, 101, 102];
        let mut rng = StdRng::seed_from_u64(3);

        let got = ids(&compose(&filter, &due, &corpus, &HashSet::new(), &mut rng));
        assert!(got.contains(&101) && got.contains(&102));
        assert!(!got.contains(&5));
        assert!(got.iter().all(|id| (101..=110).contains(id)));
    }

    #[test]
    fn already_selected_never_returned() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(20).with_question_type(QuestionType::Basic);
        let already: HashSet<QuestionId> = (1..=15).collect();
        let mut rng = StdRng::seed_from_u64(11);

        let got = ids(&compose(&filter, &[2, 16], &corpus, &already, &mut rng));
        assert_eq!(got.len(), 5);
        assert!(got.iter().all(|id| !already.contains(id)));
    }

    #[test]
    fn short_corpus_returns_short_session() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(10)
            .with_question_type(QuestionType::Specialist)
            .with_year("2020");
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(compose(&filter, &[], &corpus, &HashSet::new(), &mut rng).len(), 5);
    }

    #[test]
    fn empty_inputs_give_empty_sessions() {
        let mut rng = StdRng::seed_from_u64(0);
        let empty = Corpus::default();
        assert!(compose(&SessionFilter::new(10), &[1], &empty, &HashSet::new(), &mut rng).is_empty());
        assert!(compose(&SessionFilter::new(0), &[1], &mixed_corpus(), &HashSet::new(), &mut rng).is_empty());
    }

    #[test]
    fn unknown_department_category_falls_back_to_all_specialist() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(50)
            .with_question_type(QuestionType::Specialist)
            .with_department("garden");
        assert_eq!(candidate_pool(&filter, &corpus).len(), 15);
    }

    #[test]
    fn category_synonym_fallback_is_bounded() {
        let corpus = mixed_corpus();
        let road = SessionFilter::new(50).with_category("road");
        assert_eq!(candidate_pool(&road, &corpus).len(), 10);

        let nothing = SessionFilter::new(50).with_category("harbor");
        assert!(candidate_pool(&nothing, &corpus).is_empty());
    }

    #[test]
    fn department_without_type_uses_department_tag() {
        let mut questions = vec![question(1, QuestionType::Specialist, "道路", Some("2019"))];
        let mut tagged = question(2, QuestionType::Specialist, "道路", Some("2019"));
        tagged.department = Some("road".to_string());
        questions.push(tagged);
        let corpus = Corpus::new(questions);

        let filter = SessionFilter::new(5).with_department("road");
        let pool: Vec<_> = candidate_pool(&filter, &corpus).iter().map(|q| q.id).collect();
        assert_eq!(pool, vec![2]);
    }

    #[test]
    fn year_filter_excludes_basic() {
        let corpus = mixed_corpus();
        let filter = SessionFilter::new(50).with_year("2019");
        assert!(candidate_pool(&filter, &corpus).iter().all(|q| q.question_type == QuestionType::Specialist));
        assert_eq!(candidate_pool(&filter, &corpus).len(), 10);
    }
}
