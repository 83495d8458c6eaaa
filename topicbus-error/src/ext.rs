use std::{any::Any, error::Error};

use crate::StatusCode;

/// Расширение для ошибок библиотеки (object-safe).
///
/// Статус-код определяет уровень логирования и признак повторяемости
/// ошибки, см. [`StatusCode::log_level`].
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки.
    ///
    /// По умолчанию возвращает [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any) для downcast.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    // Ошибка без переопределения status_code (используется Internal).
    #[derive(Debug)]
    struct DefaultError(pub &'static str);

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "DefaultError: {}", self.0)
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct MissingTopic(pub &'static str);

    impl fmt::Display for MissingTopic {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "missing topic {}", self.0)
        }
    }

    impl Error for MissingTopic {}

    impl ErrorExt for MissingTopic {
        fn status_code(&self) -> StatusCode {
            StatusCode::UnknownTopic
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_default_status_is_internal() {
        let e = DefaultError("sensitive");
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert!(e.as_any().downcast_ref::<DefaultError>().is_some());
    }

    #[test]
    fn test_status_override() {
        let e = MissingTopic("a:b");
        assert_eq!(e.status_code(), StatusCode::UnknownTopic);
        assert_eq!(e.to_string(), "missing topic a:b");
    }
}
