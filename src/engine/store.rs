use super::{EventRecord, NewEventRecord};
use crate::error::StoreResult;

/// Внешнее хранилище событий.
///
/// Шине нужны только две операции: вставка записи внутри транзакции и
/// выборка всех записей.
pub trait EventStore: Send + Sync {
    /// Открывает транзакцию.
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Все записи в порядке вставки.
    fn list_all(&self) -> StoreResult<Vec<EventRecord>>;

    /// Короткое имя хранилища для логов.
    fn kind(&self) -> &'static str;
}

/// Транзакция хранилища.
///
/// Вставки видны другим только после `commit`; транзакция, брошенная без
/// `commit`, ничего не оставляет.
pub trait StoreTransaction: Send {
    fn insert(
        &mut self,
        record: NewEventRecord,
    ) -> StoreResult<EventRecord>;

    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Выполняет `f` в транзакции и фиксирует её при успехе.
///
/// Ошибка из `f` или из `commit` возвращается как есть; незафиксированная
/// транзакция откатывается при drop.
pub fn use_transaction<T, F>(
    store: &dyn EventStore,
    f: F,
) -> StoreResult<T>
where
    F: FnOnce(&mut dyn StoreTransaction) -> StoreResult<T>,
{
    let mut tx = store.begin()?;
    let value = f(&mut *tx)?;
    tx.commit()?;
    Ok(value)
}
