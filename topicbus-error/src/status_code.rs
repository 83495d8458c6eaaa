use std::fmt;

#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Коды статуса для категоризации ошибок шины.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки топиков и подписок
/// - 5xxx: Хранилище событий
/// - 6xxx: IO
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Internal = 1001,
    InvalidArgs = 1002,
    RuntimeUnavailable = 1003,

    // === 2xxx: Топики и подписки ===
    NotFound = 2000,
    InvalidTopic = 2001,
    InvalidPublishTopic = 2002,
    UnknownTopic = 2003,
    InvalidEndpoint = 2004,

    // === 5xxx: Хранилище ===
    StorageUnavailable = 5000,
    CorruptedData = 5001,
    SerializationFailed = 5002,
    PersistenceFailed = 5003,

    // === 6xxx: IO ===
    Io = 6000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Имеет ли смысл повторить операцию с этим кодом.
    ///
    /// Шина сама никогда не повторяет операции, решение остаётся за вызывающим.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable | Self::PersistenceFailed | Self::Io
        )
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::UnknownTopic => LogLevel::Debug,
            Self::InvalidArgs
            | Self::InvalidTopic
            | Self::InvalidPublishTopic
            | Self::InvalidEndpoint => LogLevel::Info,
            Self::SerializationFailed | Self::PersistenceFailed | Self::Io => LogLevel::Warn,
            Self::Internal
            | Self::CorruptedData
            | Self::StorageUnavailable
            | Self::RuntimeUnavailable => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(StatusCode::PersistenceFailed.is_retryable());
        assert!(StatusCode::Io.is_retryable());
        assert!(!StatusCode::UnknownTopic.is_retryable());
        assert!(!StatusCode::SerializationFailed.is_retryable());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(StatusCode::UnknownTopic.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::InvalidTopic.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::PersistenceFailed.log_level(), LogLevel::Warn);
        assert_eq!(StatusCode::CorruptedData.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_code_matches_range() {
        assert_eq!(StatusCode::UnknownTopic.code(), 2003);
        assert_eq!(u32::from(StatusCode::Io), 6000);
    }

    #[test]
    fn test_display_contains_name_and_code() {
        let s = StatusCode::InvalidPublishTopic.to_string();
        assert!(s.contains("InvalidPublishTopic"), "got: {s}");
        assert!(s.contains("2002"), "got: {s}");
    }
}
