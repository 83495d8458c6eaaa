use std::{fs, io};

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{FileLogConfig, LoggingConfig},
    formatter::{build_formatter, FormatOptions},
};

/// Консольный слой (stdout).
pub(crate) fn console_layer<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let options = FormatOptions {
        format: config.format,
        with_ansi: config.with_ansi,
        with_target: config.with_target,
    };
    build_formatter(options, io::stdout as fn() -> io::Stdout)
}

/// Неблокирующий файловый слой с ежедневной ротацией.
///
/// Директория создаётся при необходимости. `WorkerGuard` нужно держать до
/// конца работы, иначе хвост буфера потеряется.
pub(crate) fn file_layer<S>(
    config: &FileLogConfig,
    with_target: bool,
) -> io::Result<(Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(&config.dir)?;

    let appender = rolling::daily(&config.dir, &config.file_name);
    let (writer, guard) = non_blocking(appender);

    let options = FormatOptions {
        format: config.format,
        with_ansi: false,
        with_target,
    };
    Ok((build_formatter(options, writer), guard))
}
