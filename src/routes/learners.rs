use std::collections::HashSet;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, MAX_SESSION_SIZE};
use crate::corpus::{departments, Question, QuestionId, QuestionType};
use crate::extractors::{JsonBody, PathParams, QueryParams};
use crate::response::{created, ok, AppError};
use crate::srs::{LearningRecord, SessionFilter};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id/answers", post(submit_answer))
        .route("/:learner_id/sessions", post(compose_session))
        .route("/:learner_id/statistics", get(get_statistics))
        .route("/:learner_id/due", get(list_due))
        .route("/:learner_id/review-list", get(adaptive_review_list))
        .route("/:learner_id/history", get(list_history))
        .route(
            "/:learner_id/records/:question_id",
            get(get_record).delete(reset_record),
        )
        .route("/:learner_id/bookmarks", get(list_bookmarks))
        .route("/:learner_id/bookmarks/cleanup", post(cleanup_bookmarks))
        .route(
            "/:learner_id/bookmarks/:question_id",
            put(add_bookmark).delete(remove_bookmark),
        )
}

/// Wire view of a learning record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordView {
    question_id: QuestionId,
    correct_count: u32,
    wrong_count: u32,
    total_attempts: u32,
    difficulty_level: f64,
    mastered: bool,
    next_review: DateTime<Utc>,
    interval_days: u32,
    first_attempt: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
}

impl RecordView {
    fn new(question_id: QuestionId, record: LearningRecord) -> Self {
        Self {
            question_id,
            correct_count: record.correct_count,
            wrong_count: record.wrong_count,
            total_attempts: record.total_attempts,
            difficulty_level: record.difficulty_level,
            mastered: record.mastered,
            next_review: record.next_review,
            interval_days: record.interval_days,
            first_attempt: record.first_attempt,
            last_attempt: record.last_attempt,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerRequest {
    question_id: QuestionId,
    is_correct: bool,
}

async fn submit_answer(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
    JsonBody(req): JsonBody<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let engine = state.engine();
    let record = engine.apply_outcome(&learner_id, req.question_id, req.is_correct, engine.now())?;
    Ok(created(RecordView::new(req.question_id, record)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ComposeSessionRequest {
    department: Option<String>,
    question_type: Option<QuestionType>,
    category: Option<String>,
    year: Option<String>,
    /// Zero or negative sizes ask for an empty session.
    target_size: Option<i64>,
    max_review_ratio: Option<f64>,
    already_selected: Vec<QuestionId>,
    include_questions: bool,
}

impl ComposeSessionRequest {
    fn to_filter(&self, state: &AppState) -> Result<SessionFilter, AppError> {
        let settings = state.engine().settings();
        let requested = self
            .target_size
            .unwrap_or(i64::from(settings.questions_per_session))
            .max(0);
        let target_size = match u32::try_from(requested) {
            Ok(size) if size <= MAX_SESSION_SIZE => size,
            _ => {
                return Err(AppError::bad_request(
                    "INVALID_TARGET_SIZE",
                    &format!("targetSize must be at most {MAX_SESSION_SIZE}"),
                ))
            }
        };

        let mut filter = SessionFilter::new(target_size)
            .with_max_review_ratio(self.max_review_ratio.unwrap_or(settings.max_review_ratio));
        if let Some(department) = self.department.as_deref().filter(|d| !d.trim().is_empty()) {
            if !departments::is_known(department.trim()) {
                return Err(AppError::bad_request(
                    "UNKNOWN_DEPARTMENT",
                    &format!("Unknown department: {department}"),
                ));
            }
            filter = filter.with_department(department);
        }
        if let Some(question_type) = self.question_type {
            filter = filter.with_question_type(question_type);
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category.as_str());
        }
        if let Some(year) = &self.year {
            filter = filter.with_year(year.as_str());
        }
        Ok(filter)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    question_ids: Vec<QuestionId>,
    size: usize,
    target_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    questions: Option<Vec<Question>>,
}

async fn compose_session(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
    JsonBody(req): JsonBody<ComposeSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let filter = req.to_filter(&state)?;
    let already: HashSet<QuestionId> = req.already_selected.iter().copied().collect();

    let questions = state.engine().compose_session_with(
        &learner_id,
        &filter,
        &already,
        &mut rand::thread_rng(),
    )?;

    Ok(ok(SessionResponse {
        question_ids: questions.iter().map(|q| q.id).collect(),
        size: questions.len(),
        target_size: filter.target_size(),
        questions: req.include_questions.then_some(questions),
    }))
}

async fn get_statistics(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.engine().get_statistics(&learner_id)?))
}

async fn list_due(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.engine().due_reviews(&learner_id)?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdList {
    question_ids: Vec<QuestionId>,
}

async fn adaptive_review_list(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
) -> Result<impl IntoResponse, AppError> {
    let question_ids = state.engine().adaptive_review_list(&learner_id)?;
    Ok(ok(IdList { question_ids }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn list_history(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
    QueryParams(q): QueryParams<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    Ok(ok(state.engine().history(&learner_id, limit)?))
}

async fn get_record(
    State(state): State<AppState>,
    PathParams((learner_id, question_id)): PathParams<(String, QuestionId)>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .engine()
        .get_record(&learner_id, question_id)?
        .ok_or_else(|| AppError::not_found("No readable record for this question"))?;
    Ok(ok(RecordView::new(question_id, record)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Removed {
    removed: bool,
}

async fn reset_record(
    State(state): State<AppState>,
    PathParams((learner_id, question_id)): PathParams<(String, QuestionId)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.engine().reset_record(&learner_id, question_id)?;
    Ok(ok(Removed { removed }))
}

async fn list_bookmarks(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
) -> Result<impl IntoResponse, AppError> {
    let question_ids = state.engine().bookmarks(&learner_id)?;
    Ok(ok(IdList { question_ids }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Added {
    added: bool,
}

async fn add_bookmark(
    State(state): State<AppState>,
    PathParams((learner_id, question_id)): PathParams<(String, QuestionId)>,
) -> Result<Response, AppError> {
    let added = state.engine().add_bookmark(&learner_id, question_id)?;
    Ok(if added {
        created(Added { added }).into_response()
    } else {
        ok(Added { added }).into_response()
    })
}

async fn remove_bookmark(
    State(state): State<AppState>,
    PathParams((learner_id, question_id)): PathParams<(String, QuestionId)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.engine().remove_bookmark(&learner_id, question_id)?;
    Ok(ok(Removed { removed }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResult {
    removed: usize,
}

async fn cleanup_bookmarks(
    State(state): State<AppState>,
    PathParams(learner_id): PathParams<String>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.engine().cleanup_mastered_bookmarks(&learner_id)?;
    Ok(ok(CleanupResult { removed }))
}
