use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит `WorkerGuard` файлового слоя: пока handle жив, фоновый writer
/// продолжает сбрасывать буфер.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    /// Порог, после которого долгий shutdown считается подозрительным
    flush_timeout: Duration,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            flush_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_flush_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Есть ли активный файловый вывод.
    pub fn has_file_output(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает файловый буфер и отключает файловый вывод.
    pub fn shutdown(mut self) {
        let Some(guard) = self.file_guard.take() else {
            return;
        };

        tracing::debug!("flushing file log");
        let start = Instant::now();
        drop(guard);
        let elapsed = start.elapsed();

        if elapsed > self.flush_timeout {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                self.flush_timeout.as_millis()
            );
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_output", &self.file_guard.is_some())
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
