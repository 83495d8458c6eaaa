use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    event::Event,
    topic::{TopicPath, READ_SEGMENT},
};
use crate::{
    engine::{use_transaction, EventRecord, EventStore, NewEventRecord},
    error::{BusError, BusResult},
};

/// Глобальная политика сохранения.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistencePolicy {
    /// Сохранять также топики, оканчивающиеся на `read`.
    pub persist_all: bool,
}

/// Решение гейта для одного топика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Хранилище не настроено.
    NoStore,
    /// `...:read` при выключенном `persist_all`.
    SkipRead,
    Persist,
}

/// Решает, сохранять ли публикуемое событие, и сохраняет его.
#[derive(Clone, Default)]
pub struct PersistenceGate {
    store: Option<Arc<dyn EventStore>>,
    policy: PersistencePolicy,
}

impl PersistenceGate {
    pub fn new(
        store: Option<Arc<dyn EventStore>>,
        policy: PersistencePolicy,
    ) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> Option<&Arc<dyn EventStore>> {
        self.store.as_ref()
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    pub fn decide(
        &self,
        topic: &TopicPath,
    ) -> GateDecision {
        if self.store.is_none() {
            GateDecision::NoStore
        } else if !self.policy.persist_all && topic.last_segment() == READ_SEGMENT {
            GateDecision::SkipRead
        } else {
            GateDecision::Persist
        }
    }

    /// Сериализует payload и вставляет запись в одной транзакции.
    ///
    /// Возвращает `Ok(None)`, если событие не подлежит сохранению.
    pub fn persist(
        &self,
        topic: &TopicPath,
        event: &Event,
    ) -> BusResult<Option<EventRecord>> {
        let decision = self.decide(topic);
        let store = match (decision, &self.store) {
            (GateDecision::Persist, Some(store)) => store,
            _ => {
                debug!(topic = %topic, ?decision, "event not persisted");
                return Ok(None);
            }
        };

        let payload_json = event.payload().to_json().map_err(|e| {
            warn!(topic = %topic, error = %e, "payload is not serializable");
            BusError::SerializationFailure {
                topic: topic.to_string(),
                reason: e.to_string(),
            }
        })?;

        let new_record = NewEventRecord::new(
            topic.as_str(),
            payload_json,
            event.published_at(),
        );
        let record = use_transaction(store.as_ref(), |tx| tx.insert(new_record)).map_err(
            |source| {
                warn!(topic = %topic, store = store.kind(), error = %source, "event store insert failed");
                BusError::PersistenceFailure {
                    topic: topic.to_string(),
                    source,
                }
            },
        )?;

        debug!(topic = %topic, id = record.id, "event persisted");
        Ok(Some(record))
    }
}

impl std::fmt::Debug for PersistenceGate {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PersistenceGate")
            .field("store", &self.store.as_ref().map(|s| s.kind()))
            .field("policy", &self.policy)
            .finish()
    }
}
