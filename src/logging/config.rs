use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ensure, StatusCode, TopicbusResult};

/// Формат вывода событий лога.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Файловый вывод: ежедневная ротация в `dir/file_name.YYYY-MM-DD`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub format: LogFormat,
}

/// Настройки логирования.
///
/// `RUST_LOG`, если задана, имеет приоритет над `level`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Директива фильтра: `info`, `debug`, `topicbus=trace,warn` и т.п.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub with_ansi: bool,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> TopicbusResult<()> {
        ensure!(
            !self.level.trim().is_empty(),
            StatusCode::InvalidArgs,
            "logging.level must not be empty"
        );
        if let Some(file) = &self.file {
            ensure!(
                !file.file_name.trim().is_empty(),
                StatusCode::InvalidArgs,
                "logging.file.file_name must not be empty"
            );
        }
        Ok(())
    }

    pub(crate) fn filter_directive(&self) -> &str {
        self.level.trim()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_name() -> String {
    "topicbus.log".to_string()
}

fn default_true() -> bool {
    true
}
