use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_DIR: &str = "logs";
const FILE_PREFIX: &str = "servicebody-backend";

/// Console plus daily-rolling file logging. Keep the value alive for the
/// lifetime of the process, dropping it flushes and stops the file writers.
pub struct Logger {
    pub guards: Vec<WorkerGuard>,
}

impl Logger {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let guards = Self::setup_logging()?;
        Ok(Logger { guards })
    }

    pub fn setup_logging() -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
        for dir in [LOG_DIR, "logs/error", "logs/json", "logs/error/json"] {
            std::fs::create_dir_all(dir)?;
        }

        let console_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,servicebody_backend=debug"));
        let file_level = std::env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
        let error_level = std::env::var("ERROR_FILE_LOG_LEVEL").unwrap_or_else(|_| "error".to_string());

        let (general, general_guard) =
            non_blocking(rolling::daily(LOG_DIR, format!("{}.log", FILE_PREFIX)));
        let (errors, errors_guard) =
            non_blocking(rolling::daily("logs/error", format!("{}-error.log", FILE_PREFIX)));
        let (general_json, general_json_guard) =
            non_blocking(rolling::daily("logs/json", format!("{}.json", FILE_PREFIX)));
        let (errors_json, errors_json_guard) =
            non_blocking(rolling::daily("logs/error/json", format!("{}-error.json", FILE_PREFIX)));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(true)
                    .with_filter(console_filter),
            )
            .with(
                fmt::layer()
                    .with_writer(general)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&file_level)),
            )
            .with(
                fmt::layer()
                    .with_writer(errors)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new(&error_level)),
            )
            .with(
                fmt::layer()
                    .json()
                    .with_writer(general_json)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_filter(EnvFilter::new(&file_level)),
            )
            .with(
                fmt::layer()
                    .json()
                    .with_writer(errors_json)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_filter(EnvFilter::new(&error_level)),
            )
            .try_init()?;

        Ok(vec![general_guard, errors_guard, general_json_guard, errors_json_guard])
    }
}
