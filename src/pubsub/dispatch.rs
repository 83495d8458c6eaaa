use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc},
};
use tracing::trace;

use super::{event::Event, trie::ListenerSnapshot};
use crate::error::{BusError, BusResult};

/// Почему событие не дошло до endpoint.
///
/// Ядро такие ошибки не видит: они только пишутся в trace-лог задачи
/// доставки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("endpoint is closed")]
    Closed,
    #[error("endpoint has no receivers")]
    NoReceivers,
}

/// Приёмник событий, переданный при подписке.
///
/// Шина только отдаёт в него копии событий и никогда не читает обратно.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn deliver(
        &self,
        event: Event,
    ) -> Result<(), DeliveryError>;

    /// Закрыт ли приёмник навсегда. Закрытый endpoint отклоняется при
    /// подписке и пропускается при доставке.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Разделяемая ссылка на endpoint, которую хранит дерево.
pub type Listener = Arc<dyn Endpoint>;

/// Ограниченный канал: медленный получатель задерживает только свою задачу
/// доставки.
#[async_trait]
impl Endpoint for mpsc::Sender<Event> {
    async fn deliver(
        &self,
        event: Event,
    ) -> Result<(), DeliveryError> {
        self.send(event).await.map_err(|_| DeliveryError::Closed)
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

#[async_trait]
impl Endpoint for mpsc::UnboundedSender<Event> {
    async fn deliver(
        &self,
        event: Event,
    ) -> Result<(), DeliveryError> {
        self.send(event).map_err(|_| DeliveryError::Closed)
    }

    fn is_closed(&self) -> bool {
        mpsc::UnboundedSender::is_closed(self)
    }
}

/// Broadcast-канал никогда не считается закрытым: получатели могут
/// появиться позже через `subscribe()`.
#[async_trait]
impl Endpoint for broadcast::Sender<Event> {
    async fn deliver(
        &self,
        event: Event,
    ) -> Result<(), DeliveryError> {
        self.send(event)
            .map(|_| ())
            .map_err(|_| DeliveryError::NoReceivers)
    }
}

/// Endpoint из замыкания.
pub struct CallbackEndpoint<F> {
    callback: F,
}

impl<F> CallbackEndpoint<F>
where
    F: Fn(Event) + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> fmt::Debug for CallbackEndpoint<F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("CallbackEndpoint")
    }
}

#[async_trait]
impl<F> Endpoint for CallbackEndpoint<F>
where
    F: Fn(Event) + Send + Sync + 'static,
{
    async fn deliver(
        &self,
        event: Event,
    ) -> Result<(), DeliveryError> {
        (self.callback)(event);
        Ok(())
    }
}

/// Запускает задачи доставки на Tokio runtime.
///
/// На каждый снимок слушателей одного узла приходится одна задача; внутри
/// задачи endpoint'ы получают событие по очереди, в порядке регистрации.
/// Публикующий никогда не ждёт этих задач.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handle: Handle,
}

impl Dispatcher {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Диспетчер на текущем runtime.
    pub fn current() -> BusResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| BusError::RuntimeUnavailable)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Планирует доставку и возвращает число запущенных задач.
    pub fn dispatch(
        &self,
        event: &Event,
        snapshots: Vec<ListenerSnapshot<Listener>>,
    ) -> usize {
        let tasks = snapshots.len();
        for snapshot in snapshots {
            self.handle.spawn(deliver_snapshot(event.clone(), snapshot));
        }
        tasks
    }
}

async fn deliver_snapshot(
    event: Event,
    snapshot: ListenerSnapshot<Listener>,
) {
    let ListenerSnapshot {
        kind,
        depth,
        listeners,
    } = snapshot;

    for (idx, listener) in listeners.iter().enumerate() {
        if listener.is_closed() {
            trace!(topic = event.topic(), ?kind, depth, idx, "skipping closed endpoint");
            continue;
        }
        match listener.deliver(event.clone()).await {
            Ok(()) => trace!(topic = event.topic(), ?kind, depth, idx, "event delivered"),
            Err(err) => trace!(topic = event.topic(), ?kind, depth, idx, error = %err, "delivery failed"),
        }
    }
}
