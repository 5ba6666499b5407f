use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use exam_practice_engine::clock::ManualClock;
use exam_practice_engine::config::{Config, SessionConfig};
use exam_practice_engine::corpus::{CorpusCache, JsonFileSource, Question, QuestionSource, StaticSource};
use exam_practice_engine::routes::build_router;
use exam_practice_engine::srs::{EngineSettings, ExamEngine};
use exam_practice_engine::state::AppState;
use exam_practice_engine::store::Store;

use super::fixtures::sample_questions;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub engine: Arc<ExamEngine>,
    pub store: Arc<Store>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    _temp_dir: TempDir,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn test_config(temp_dir: &TempDir) -> Config {
    // Built directly so tests never race on process env vars.
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: temp_dir.path().join("exam-test.sled").to_string_lossy().to_string(),
        questions_path: temp_dir.path().join("questions.json").to_string_lossy().to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        session: SessionConfig::default(),
    }
}

fn spawn_with_source(source: impl FnOnce(&Config) -> Arc<dyn QuestionSource>) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&temp_dir);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let clock = Arc::new(ManualClock::new(t0()));
    let corpus = Arc::new(CorpusCache::new(source(&config), clock.clone()));
    let engine = Arc::new(ExamEngine::new(
        store.clone(),
        corpus,
        clock.clone(),
        EngineSettings::from(&config.session),
    ));

    let state = AppState::new(engine.clone(), store.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        engine,
        store,
        clock,
        config,
        _temp_dir: temp_dir,
    }
}

pub fn spawn_with_questions(questions: Vec<Question>) -> TestApp {
    spawn_with_source(move |_| Arc::new(StaticSource::new(questions)))
}

pub fn spawn_test_server() -> TestApp {
    spawn_with_questions(sample_questions())
}

/// Points the corpus at a file that does not exist.
pub fn spawn_without_corpus() -> TestApp {
    spawn_with_source(|config| Arc::new(JsonFileSource::new(&config.questions_path)))
}
