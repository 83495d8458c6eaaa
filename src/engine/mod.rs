//! Хранилище опубликованных событий.
//!
//! - `record`: сохранённая запись и запись до вставки.
//! - `store`: трейты `EventStore` / `StoreTransaction` и `use_transaction`.
//! - `memory`: хранилище в памяти.
//! - `aof`: append-only журнал JSON-записей.

pub mod aof;
pub mod memory;
pub mod record;
pub mod store;

pub use aof::*;
pub use memory::*;
pub use record::*;
pub use store::*;
