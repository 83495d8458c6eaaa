//! Логирование на `tracing`.
//!
//! - `config`: `LoggingConfig` (уровень, формат, ANSI, файловый вывод).
//! - `filters`: `EnvFilter` из `RUST_LOG` или конфигурации.
//! - `formatter`: fmt-слои compact/pretty/json.
//! - `sinks`: консольный и файловый слои.
//! - `handle`: `LoggingHandle`, держащий guard файлового writer'а.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
mod sinks;

pub use self::config::{FileLogConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::error::{GenericError, ResultExt, StackError, StatusCode, TopicbusResult};

/// Устанавливает глобальный subscriber.
///
/// Повторный вызов в том же процессе возвращает ошибку `Internal`.
pub fn init_logging(config: &LoggingConfig) -> TopicbusResult<LoggingHandle> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(config);
    let mut layers = vec![sinks::console_layer::<Registry>(config)];

    let file_guard = match &config.file {
        Some(file) => {
            let (layer, guard) = sinks::file_layer::<Registry>(file, config.with_target)
                .with_context(|| format!("failed to open log directory {}", file.dir.display()))?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| {
            StackError::new(GenericError::new(
                StatusCode::Internal,
                format!("global subscriber already set: {e}"),
            ))
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?config.format,
        file_enabled = file_guard.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
