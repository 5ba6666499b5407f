/// Forgetting-curve review ladder, in days, indexed by correct-answer count.
pub const BASE_INTERVALS: [u32; 8] = [1, 3, 7, 14, 30, 90, 180, 365];

/// Correct answers needed before a question counts as mastered.
pub const MASTERY_THRESHOLD: u32 = 5;

/// Lowest difficulty a record can reach (1 = easy).
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Highest difficulty a record can reach (10 = hard).
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Difficulty assigned to a freshly created record.
pub const DEFAULT_DIFFICULTY: f64 = 5.0;

/// Difficulty drop per correct answer.
pub const DIFFICULTY_STEP_CORRECT: f64 = 0.5;

/// Difficulty rise per incorrect answer.
pub const DIFFICULTY_STEP_WRONG: f64 = 1.0;

/// Interval shrink per wrong answer, and the floor of the resulting factor.
pub const WRONG_ANSWER_PENALTY: f64 = 0.1;
pub const MIN_DIFFICULTY_FACTOR: f64 = 0.1;

/// Priority given to records whose review date cannot be read.
pub const UNREADABLE_RECORD_PRIORITY: f64 = 999.0;

/// Priority given to bookmarks that carry no schedulable record.
pub const BOOKMARK_ONLY_PRIORITY: f64 = 0.0;

/// Default cap on the bounded due set.
pub const DEFAULT_DUE_REVIEW_LIMIT: usize = 50;

/// Default number of questions per session.
pub const DEFAULT_QUESTIONS_PER_SESSION: u32 = 10;

/// Upper bound accepted for a requested session size.
pub const MAX_SESSION_SIZE: u32 = 200;

/// Default share of a session that may be spent on reviews.
pub const DEFAULT_MAX_REVIEW_RATIO: f64 = 0.5;

/// Distinct learner keys tolerated before idle locks are swept.
pub const DEFAULT_LOCK_TABLE_HIGH_WATER: usize = 100;

/// Default freshness window for the cached question corpus (seconds).
pub const DEFAULT_CORPUS_CACHE_TTL_SECS: u64 = 3600;

/// Category values meaning "no category filter".
pub const ALL_CATEGORIES: &str = "ALL";
pub const ALL_CATEGORIES_JA: &str = "全体";

/// Default page size for answer history listings.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Largest answer history page served at once.
pub const MAX_HISTORY_LIMIT: usize = 500;
