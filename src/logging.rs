use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "exam-practice-engine";
const MAX_LOG_FILES: usize = 14;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

/// Installs the global subscriber: human-readable stdout plus, when enabled,
/// daily JSON files under `log_dir`.
///
/// Calling it again is a no-op. Returns `false` when file logging was asked
/// for but the directory could not be used; stdout logging still comes up.
pub fn init_tracing(config: &LogConfig) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);
    let registry = Registry::default().with(env_filter).with(stdout_layer);

    if !config.enable_file_logs {
        let _ = registry.try_init();
        return true;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&config.log_dir)
    {
        Ok(appender) => {
            let file_layer = fmt::layer().with_writer(appender).with_ansi(false).json();
            let _ = registry.with(file_layer).try_init();
            true
        }
        Err(error) => {
            let installed = registry.try_init().is_ok();
            if installed {
                tracing::warn!(
                    log_dir = %config.log_dir,
                    error = %error,
                    "File logging unavailable, continuing with stdout only"
                );
            }
            false
        }
    }
}
