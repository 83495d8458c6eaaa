use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, error, info, trace, warn};

use super::{
    dispatch::{CallbackEndpoint, Dispatcher, Endpoint, Listener},
    event::{Event, Payload},
    gate::{PersistenceGate, PersistencePolicy},
    stats::{BusStats, StatsSnapshot},
    topic::TopicPath,
    trie::TopicTrie,
    TopicInterner,
};
use crate::{
    config::Settings,
    engine::EventStore,
    error::{BusError, BusResult, ErrorExt, LogLevel, TopicbusResult},
};

/// Итог успешной публикации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Id записи в хранилище, если событие сохранено.
    pub persisted: Option<u64>,
    /// Сколько задач доставки запущено.
    pub tasks: usize,
}

/// Внутрипроцессная шина событий с иерархическими топиками.
///
/// Подписка берёт эксклюзивную блокировку дерева, публикации идут
/// параллельно под разделяемой. Сохранение выполняется синхронно внутри
/// `publish`, доставка уходит в фоновые задачи.
pub struct EventBus {
    trie: RwLock<TopicTrie<Listener>>,
    gate: PersistenceGate,
    dispatcher: Dispatcher,
    stats: BusStats,
    topics: TopicInterner,
}

/// Сборщик [`EventBus`].
#[derive(Default)]
pub struct EventBusBuilder {
    store: Option<Arc<dyn EventStore>>,
    persist_all: bool,
    runtime: Option<Handle>,
}

impl EventBusBuilder {
    pub fn store<S: EventStore + 'static>(
        mut self,
        store: S,
    ) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_store(
        mut self,
        store: Option<Arc<dyn EventStore>>,
    ) -> Self {
        self.store = store;
        self
    }

    /// Сохранять также события `...:read`.
    pub fn persist_all(
        mut self,
        persist_all: bool,
    ) -> Self {
        self.persist_all = persist_all;
        self
    }

    /// Runtime для задач доставки. По умолчанию берётся текущий.
    pub fn runtime(
        mut self,
        handle: Handle,
    ) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> BusResult<EventBus> {
        let dispatcher = match self.runtime {
            Some(handle) => Dispatcher::new(handle),
            None => Dispatcher::current()?,
        };
        let policy = PersistencePolicy {
            persist_all: self.persist_all,
        };
        debug!(
            store = self.store.as_ref().map(|s| s.kind()),
            persist_all = policy.persist_all,
            "event bus created"
        );
        Ok(EventBus {
            trie: RwLock::new(TopicTrie::new()),
            gate: PersistenceGate::new(self.store, policy),
            dispatcher,
            stats: BusStats::default(),
            topics: TopicInterner::default(),
        })
    }
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Шина без хранилища на текущем runtime.
    pub fn new() -> BusResult<Self> {
        Self::builder().build()
    }

    /// Шина с хранилищем и политикой из настроек.
    pub fn from_settings(settings: &Settings) -> TopicbusResult<Self> {
        settings.validate()?;
        let store = settings.store.open()?;
        let bus = Self::builder()
            .shared_store(store)
            .persist_all(settings.persist_all_events)
            .build()?;
        Ok(bus)
    }

    /// Подписывает endpoint на топик (`a:b` или `a:*`).
    pub fn subscribe<E: Endpoint + 'static>(
        &self,
        topic: &str,
        endpoint: E,
    ) -> BusResult<()> {
        self.subscribe_shared(topic, Arc::new(endpoint))
    }

    /// Подписка уже разделяемым endpoint'ом; один endpoint можно повесить
    /// на несколько топиков.
    pub fn subscribe_shared(
        &self,
        topic: &str,
        listener: Listener,
    ) -> BusResult<()> {
        let path = TopicPath::subscription(topic)?;
        if listener.is_closed() {
            return Err(BusError::InvalidEndpoint {
                topic: topic.to_string(),
            });
        }

        let kind = self.trie.write().subscribe(&path, listener)?;
        self.stats.record_subscription();
        debug!(topic, ?kind, "subscribed");
        Ok(())
    }

    /// Подписка с ограниченным каналом ёмкости `capacity`.
    pub fn subscribe_channel(
        &self,
        topic: &str,
        capacity: usize,
    ) -> BusResult<mpsc::Receiver<Event>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribe(topic, tx)?;
        Ok(rx)
    }

    pub fn subscribe_unbounded(
        &self,
        topic: &str,
    ) -> BusResult<mpsc::UnboundedReceiver<Event>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(topic, tx)?;
        Ok(rx)
    }

    /// Подписка замыканием. Замыкание вызывается внутри задачи доставки и
    /// не должно блокировать.
    pub fn subscribe_fn<F>(
        &self,
        topic: &str,
        callback: F,
    ) -> BusResult<()>
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.subscribe(topic, CallbackEndpoint::new(callback))
    }

    /// Публикует событие.
    ///
    /// Порядок: проверка топика, проверка существования пути, решение гейта
    /// и синхронное сохранение, сбор слушателей, запуск доставки. Ошибка
    /// сериализации или хранилища отменяет доставку целиком.
    pub fn publish(
        &self,
        topic: &str,
        payload: impl Into<Payload>,
    ) -> BusResult<PublishReport> {
        let result = self.try_publish(topic, payload.into());
        if let Err(err) = &result {
            self.stats.record_rejected();
            log_rejected(topic, err);
        }
        result
    }

    fn try_publish(
        &self,
        topic: &str,
        payload: Payload,
    ) -> BusResult<PublishReport> {
        let path = TopicPath::publication(topic)?;

        let trie = self.trie.read();
        if !trie.exists(&path) {
            return Err(BusError::UnknownTopic {
                topic: topic.to_string(),
            });
        }

        let mut event = Event::new(self.topics.intern(topic), payload, Utc::now());
        let record = self.gate.persist(&path, &event)?;
        if let Some(record) = &record {
            event = event.with_payload_json(record.payload_json.as_str());
        }

        let snapshots = trie.collect(&path);
        drop(trie);

        trace!(topic, snapshots = snapshots.len(), "listeners collected");
        let tasks = self.dispatcher.dispatch(&event, snapshots);
        self.stats.record_publish(record.is_some(), tasks);

        Ok(PublishReport {
            persisted: record.map(|r| r.id),
            tasks,
        })
    }

    /// Есть ли для топика литеральный путь в дереве.
    ///
    /// Подписка `a:*` не делает `a:b` существующим.
    pub fn exists(
        &self,
        topic: &str,
    ) -> bool {
        TopicPath::publication(topic)
            .map(|path| self.trie.read().exists(&path))
            .unwrap_or(false)
    }

    /// Все литеральные топики дерева, отсортированные.
    pub fn topics(&self) -> Vec<String> {
        self.trie.read().topics()
    }

    pub fn listener_count(&self) -> usize {
        self.trie.read().listener_count()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn store(&self) -> Option<&Arc<dyn EventStore>> {
        self.gate.store()
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.gate.policy()
    }
}

/// Отклонённая публикация логируется на уровне её статус-кода: ошибки
/// вызывающего тише, отказы хранилища громче.
fn log_rejected(
    topic: &str,
    err: &BusError,
) {
    let status = err.status_code();
    let code = status.code();
    let retryable = status.is_retryable();
    match status.log_level() {
        LogLevel::Trace => trace!(topic, code, retryable, error = %err, "publish rejected"),
        LogLevel::Debug => debug!(topic, code, retryable, error = %err, "publish rejected"),
        LogLevel::Info => info!(topic, code, retryable, error = %err, "publish rejected"),
        LogLevel::Warn => warn!(topic, code, retryable, error = %err, "publish rejected"),
        LogLevel::Error => error!(topic, code, retryable, error = %err, "publish rejected"),
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("gate", &self.gate)
            .field("stats", &self.stats.snapshot())
            .field("interned_topics", &self.topics.len())
            .finish_non_exhaustive()
    }
}
