use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::RwLock;

use super::{EventRecord, EventStore, NewEventRecord, StoreTransaction};
use crate::error::StoreResult;

#[derive(Debug)]
struct Shared {
    records: RwLock<Vec<EventRecord>>,
    next_id: AtomicU64,
}

/// Хранилище событий в памяти процесса.
///
/// Клоны делят одно и то же содержимое.
#[derive(Debug, Clone)]
pub struct InMemoryEventStore {
    shared: Arc<Shared>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                records: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for InMemoryEventStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
        }))
    }

    fn list_all(&self) -> StoreResult<Vec<EventRecord>> {
        Ok(self.shared.records.read().clone())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

struct MemoryTransaction {
    shared: Arc<Shared>,
    pending: Vec<EventRecord>,
}

impl StoreTransaction for MemoryTransaction {
    fn insert(
        &mut self,
        record: NewEventRecord,
    ) -> StoreResult<EventRecord> {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let record = record.with_id(id);
        self.pending.push(record.clone());
        Ok(record)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { shared, pending } = *self;
        shared.records.write().extend(pending);
        Ok(())
    }
}
