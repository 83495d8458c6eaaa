use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки хранилища событий.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Ошибка ввода-вывода
    #[error("I/O error: {reason}")]
    Io { reason: String },
    /// Журнал повреждён или имеет чужой формат
    #[error("corrupted event log at {location}: {reason}")]
    Corrupted { location: String, reason: String },
    /// Запись не удалось закодировать в формат хранилища
    #[error("failed to encode event record: {reason}")]
    Encode { reason: String },
    /// Хранилище закрыто или отравлено паникой другого потока
    #[error("event store is closed")]
    Closed,
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            reason: err.to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Io { .. } => StatusCode::Io,
            Self::Corrupted { .. } => StatusCode::CorruptedData,
            Self::Encode { .. } => StatusCode::SerializationFailed,
            Self::Closed => StatusCode::StorageUnavailable,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_codes() {
        let io: StoreError = std::io::Error::other("disk gone").into();
        assert_eq!(io.status_code(), StatusCode::Io);
        assert!(io.to_string().contains("disk gone"));

        assert_eq!(StoreError::Closed.status_code(), StatusCode::StorageUnavailable);
        assert_eq!(
            StoreError::Encode {
                reason: "x".into()
            }
            .status_code(),
            StatusCode::SerializationFailed
        );
    }

    #[test]
    fn test_corrupted_names_location() {
        let err = StoreError::Corrupted {
            location: "events.aof:7".to_string(),
            reason: "bad json".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CorruptedData);
        assert!(err.to_string().contains("events.aof:7"));
    }
}
