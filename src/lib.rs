/// Settings loading (defaults, TOML file, `TOPICBUS_*` environment).
pub mod config;
/// Event stores: in-memory and append-only file.
pub mod engine;
/// Error types and result aliases.
pub mod error;
/// Logging setup on top of `tracing`.
pub mod logging;
/// Pub/Sub: topic trie, dispatcher, persistence gate, `EventBus`.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Settings.
pub use crate::config::{Settings, StoreKind, StoreSettings};
/// Event stores.
pub use engine::{
    use_transaction, AofEventStore, EventRecord, EventStore, InMemoryEventStore, NewEventRecord,
    StoreTransaction, SyncPolicy,
};
/// Errors and result types.
pub use error::{BusError, BusResult, StackError, StatusCode, StoreError, StoreResult};
/// Logging.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{
    CallbackEndpoint, DeliveryError, Endpoint, Event, EventBus, EventBusBuilder, Listener,
    Payload, PublishReport, StatsSnapshot, TopicPath,
};
