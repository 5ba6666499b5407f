use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CORPUS_CACHE_TTL_SECS, DEFAULT_DUE_REVIEW_LIMIT, DEFAULT_LOCK_TABLE_HIGH_WATER,
    DEFAULT_MAX_REVIEW_RATIO, DEFAULT_QUESTIONS_PER_SESSION,
};
use crate::logging::LogConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub questions_path: String,
    pub cors_origin: String,
    pub session: SessionConfig,
}

/// Tunables for scheduling and session composition.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub questions_per_session: u32,
    pub max_review_ratio: f64,
    pub due_review_limit: usize,
    pub lock_table_high_water: usize,
    pub corpus_cache_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions_per_session: DEFAULT_QUESTIONS_PER_SESSION,
            max_review_ratio: DEFAULT_MAX_REVIEW_RATIO,
            due_review_limit: DEFAULT_DUE_REVIEW_LIMIT,
            lock_table_high_water: DEFAULT_LOCK_TABLE_HIGH_WATER,
            corpus_cache_ttl_secs: DEFAULT_CORPUS_CACHE_TTL_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/exam-practice.sled"),
            questions_path: env_or("QUESTIONS_PATH", "./data/questions.json"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            session: SessionConfig {
                questions_per_session: env_or_parse(
                    "QUESTIONS_PER_SESSION",
                    DEFAULT_QUESTIONS_PER_SESSION,
                ),
                max_review_ratio: env_or_ratio("MAX_REVIEW_RATIO", DEFAULT_MAX_REVIEW_RATIO),
                due_review_limit: env_or_parse("DUE_REVIEW_LIMIT", DEFAULT_DUE_REVIEW_LIMIT),
                lock_table_high_water: env_or_parse(
                    "LOCK_TABLE_HIGH_WATER",
                    DEFAULT_LOCK_TABLE_HIGH_WATER,
                ),
                corpus_cache_ttl_secs: env_or_parse(
                    "CORPUS_CACHE_TTL_SECS",
                    DEFAULT_CORPUS_CACHE_TTL_SECS,
                ),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Like [`env_or_parse`] but rejects values outside `[0, 1]`.
pub fn env_or_ratio(key: &str, default: f64) -> f64 {
    let value = env_or_parse(key, default);
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        tracing::warn!(key, value, "Ratio out of range, using default");
        default
    }
}
