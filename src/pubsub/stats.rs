use std::sync::atomic::{AtomicU64, Ordering};

/// Счётчики шины. Обновляются без блокировок, читаются через
/// [`BusStats::snapshot`].
#[derive(Debug, Default)]
pub struct BusStats {
    /// Успешные вызовы `publish`
    published: AtomicU64,
    /// События, записанные в хранилище
    persisted: AtomicU64,
    /// Публикации, для которых гейт решил не сохранять событие
    persistence_skipped: AtomicU64,
    /// Публикации, отклонённые с ошибкой
    rejected: AtomicU64,
    /// Запущенные задачи доставки
    delivery_tasks: AtomicU64,
    /// Зарегистрированные подписки
    subscriptions: AtomicU64,
}

/// Значения счётчиков на момент чтения.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub published: u64,
    pub persisted: u64,
    pub persistence_skipped: u64,
    pub rejected: u64,
    pub delivery_tasks: u64,
    pub subscriptions: u64,
}

impl BusStats {
    pub(crate) fn record_publish(
        &self,
        persisted: bool,
        tasks: usize,
    ) {
        self.published.fetch_add(1, Ordering::Relaxed);
        if persisted {
            self.persisted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.persistence_skipped.fetch_add(1, Ordering::Relaxed);
        }
        self.delivery_tasks
            .fetch_add(tasks as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            persistence_skipped: self.persistence_skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivery_tasks: self.delivery_tasks.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
        }
    }
}
