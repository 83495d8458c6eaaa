//! Типы ошибок шины.
//!
//! Сами перечисления живут в крейте `topicbus-error`; здесь только
//! переэкспорт и псевдонимы результатов.

pub use topicbus_error::{
    bail, ensure, BusError, ErrorExt, GenericError, LogLevel, ResultExt, StackError,
    StatusCode, StoreError, TopicbusResult,
};

/// Результат операций шины (`subscribe`, `publish`).
pub type BusResult<T> = Result<T, BusError>;

/// Результат операций хранилища событий.
pub type StoreResult<T> = Result<T, StoreError>;
