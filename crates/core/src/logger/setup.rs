use once_cell::sync::OnceCell;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::environment::{env_is_true, env_or_default};

// Keep the non-blocking writers alive for the lifetime of the process
static INFO_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static ERROR_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging options read from the environment
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub app_env: String,
    pub log_level: String,
    pub log_dir: String,
    pub log_rotation: String,
    pub info_file_name: String,
    pub error_file_name: String,
    pub enable_console_logging: bool,
    /// Emit console lines as JSON instead of the human format
    pub json_console: bool,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            app_env: env_or_default("APP_ENV", "local"),
            log_level: env_or_default("LOG_LEVEL", "info"),
            log_dir: env_or_default("LOG_DIR", "log_files"),
            log_rotation: env_or_default("LOG_ROTATION", "daily"),
            info_file_name: env_or_default("LOG_INFO_FILE", "info.log"),
            error_file_name: env_or_default("LOG_ERROR_FILE", "error.log"),
            enable_console_logging: env_is_true("ENABLE_CONSOLE_LOGGING", true),
            json_console: env_or_default("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        }
    }

    pub fn is_local(&self) -> bool {
        self.app_env == "local"
    }
}

fn parse_rotation(s: &str) -> Rotation {
    match s.to_lowercase().as_str() {
        "minutely" | "minute" | "min" => Rotation::MINUTELY,
        "hourly" | "hour" | "hr" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// Installs the global subscriber.
///
/// `APP_ENV=local` logs to stdout only. Any other environment writes an info
/// file and an error-only file under `LOG_DIR`, plus stdout unless
/// `ENABLE_CONSOLE_LOGGING=false`.
pub async fn setup_logging() -> anyhow::Result<()> {
    let config = LogConfig::from_env();

    if config.is_local() {
        let console = if config.json_console {
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level))
                .boxed()
        };
        tracing::subscriber::set_global_default(Registry::default().with(console))?;

        info!(
            "logging ready: env={}, level={}, file logging=false",
            config.app_env, config.log_level
        );
        return Ok(());
    }

    std::fs::create_dir_all(&config.log_dir).map_err(|e| {
        anyhow::anyhow!("failed to create log directory '{}': {}", config.log_dir, e)
    })?;

    let info_file = RollingFileAppender::new(
        parse_rotation(&config.log_rotation),
        &config.log_dir,
        &config.info_file_name,
    );
    let error_file = RollingFileAppender::new(
        parse_rotation(&config.log_rotation),
        &config.log_dir,
        &config.error_file_name,
    );
    let (info_writer, info_guard) = tracing_appender::non_blocking(info_file);
    let (error_writer, error_guard) = tracing_appender::non_blocking(error_file);
    INFO_GUARD
        .set(info_guard)
        .map_err(|_| anyhow::anyhow!("logging already initialised"))?;
    ERROR_GUARD
        .set(error_guard)
        .map_err(|_| anyhow::anyhow!("logging already initialised"))?;

    let mut layers = vec![
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(info_writer)
            .with_filter(EnvFilter::new(&config.log_level))
            .boxed(),
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(error_writer)
            .with_filter(EnvFilter::new("error"))
            .boxed(),
    ];
    if config.enable_console_logging {
        let console = if config.json_console {
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::io::stdout)
                .with_filter(EnvFilter::new(&config.log_level))
                .boxed()
        };
        layers.push(console);
    }

    tracing::subscriber::set_global_default(Registry::default().with(layers))?;

    info!(
        "logging ready: env={}, level={}, dir={}, console={}",
        config.app_env, config.log_level, config.log_dir, config.enable_console_logging
    );
    Ok(())
}

/// Best-effort subscriber for tests; repeated calls are ignored
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation("HOURLY"), Rotation::HOURLY);
        assert_eq!(parse_rotation("min"), Rotation::MINUTELY);
        assert_eq!(parse_rotation("weekly"), Rotation::DAILY);
    }
}
