//! Подсистема Publish–Subscribe.
//!
//! - `topic`: разбор топиков `a:b:c` и `a:*`.
//! - `trie`: префиксное дерево топиков со слушателями.
//! - `event`: payload и событие, которое получают подписчики.
//! - `dispatch`: endpoint'ы и запуск задач доставки.
//! - `gate`: решение о сохранении события.
//! - `stats`: счётчики шины.
//! - `bus`: фасад `EventBus`, связывающий всё вместе.
//! - `intern` (приватный): пул `Arc<str>` для топиков событий шины.

pub mod bus;
pub mod dispatch;
pub mod event;
pub mod gate;
mod intern;
pub mod stats;
pub mod topic;
pub mod trie;

pub use bus::*;
pub use dispatch::*;
pub use event::*;
pub use gate::*;
pub(crate) use intern::TopicInterner;
pub use stats::*;
pub use topic::*;
pub use trie::*;
