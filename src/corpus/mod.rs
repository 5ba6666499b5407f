//! Question corpus: the records the engine selects from.
//!
//! The corpus itself is owned by an external loader (see [`source`]); the
//! engine only needs stable ids plus the tags it filters on. Everything else
//! about a question rides along untouched in [`Question::content`].

pub mod cache;
pub mod departments;
pub mod source;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub use cache::CorpusCache;
pub use source::{CorpusError, JsonFileSource, QuestionSource, StaticSource};

pub type QuestionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Common fundamentals paper; questions carry no exam year.
    Basic,
    /// Department paper; questions are tied to an exam year.
    Specialist,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Basic => "basic",
            QuestionType::Specialist => "specialist",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(QuestionType::Basic),
            "specialist" => Ok(QuestionType::Specialist),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question_type: QuestionType,
    pub category: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "year_as_string")]
    pub year: Option<String>,
    /// Presentation payload (stem, options, answer, explanation, ...).
    #[serde(flatten)]
    pub content: serde_json::Map<String, serde_json::Value>,
}

impl Question {
    pub fn has_year(&self) -> bool {
        self.year.is_some()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

// Exam years show up as numbers or strings depending on the exporter.
fn year_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Immutable, id-indexed snapshot of the question corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl Corpus {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut kept = Vec::with_capacity(questions.len());
        let mut index = HashMap::with_capacity(questions.len());

        for question in questions {
            if index.contains_key(&question.id) {
                tracing::warn!(question_id = question.id, "Duplicate question id in corpus, keeping first");
                continue;
            }
            index.insert(question.id, kept.len());
            kept.push(question);
        }

        Self {
            questions: kept,
            index,
        }
    }

    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&pos| &self.questions[pos])
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
