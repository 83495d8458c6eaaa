use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode, StoreError};

/// Ошибки подписки и публикации.
///
/// Все варианты возвращаются синхронно из `subscribe` / `publish`; шина
/// ничего не повторяет сама.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Пустой топик, голый разделитель, пустой сегмент или `*` не в конце
    #[error("invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: String },

    /// Приёмная сторона endpoint уже закрыта
    #[error("endpoint for '{topic}' is closed")]
    InvalidEndpoint { topic: String },

    /// Публикуемый топик содержит `*`
    #[error("published topic '{topic}' must not contain a wildcard")]
    InvalidPublishTopic { topic: String },

    /// Для топика нет ни одного литерального пути в дереве
    #[error("no listener registered for topic '{topic}'")]
    UnknownTopic { topic: String },

    /// Payload нельзя сериализовать, хотя событие подлежит сохранению
    #[error("payload for '{topic}' cannot be serialized: {reason}")]
    SerializationFailure { topic: String, reason: String },

    /// Транзакция хранилища завершилась ошибкой
    #[error("failed to persist event '{topic}': {source}")]
    PersistenceFailure {
        topic: String,
        #[source]
        source: StoreError,
    },

    /// Нет Tokio runtime, на котором можно запускать задачи доставки
    #[error("no tokio runtime available for event delivery")]
    RuntimeUnavailable,
}

impl ErrorExt for BusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidTopic { .. } => StatusCode::InvalidTopic,
            Self::InvalidEndpoint { .. } => StatusCode::InvalidEndpoint,
            Self::InvalidPublishTopic { .. } => StatusCode::InvalidPublishTopic,
            Self::UnknownTopic { .. } => StatusCode::UnknownTopic,
            Self::SerializationFailure { .. } => StatusCode::SerializationFailed,
            Self::PersistenceFailure { .. } => StatusCode::PersistenceFailed,
            Self::RuntimeUnavailable => StatusCode::RuntimeUnavailable,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
