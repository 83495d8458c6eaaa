use std::fmt;

use crate::error::{BusError, BusResult};

/// Разделитель сегментов топика.
pub const DELIMITER: char = ':';
/// Завершающий сегмент подписки на всё поддерево.
pub const WILDCARD: &str = "*";
/// Последний сегмент "читающих" событий, которые не сохраняются без
/// `persist_all`.
pub const READ_SEGMENT: &str = "read";

/// Разобранный на сегменты топик, например `orders:item:create`.
///
/// Строится в двух режимах:
/// - [`TopicPath::subscription`]: допускает `*` (позицию проверяет дерево);
/// - [`TopicPath::publication`]: запрещает `*` в любом месте.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPath {
    raw: String,
    segments: Vec<String>,
}

impl TopicPath {
    /// Топик подписки: непустой, не голый разделитель, без пустых сегментов.
    pub fn subscription(topic: &str) -> BusResult<Self> {
        if topic.is_empty() {
            return Err(invalid(topic, "an empty string is not a valid topic"));
        }
        if topic == DELIMITER.to_string() {
            return Err(invalid(topic, "a bare delimiter is not a valid topic"));
        }

        let path = Self::split(topic);
        if path.segments.iter().any(String::is_empty) {
            return Err(invalid(topic, "topic segments must not be empty"));
        }
        Ok(path)
    }

    /// Топик публикации: всегда литеральный, `*` запрещена целиком.
    ///
    /// Пустые сегменты здесь не отклоняются: ни одна подписка не может
    /// создать такой путь, поэтому публикация получит `UnknownTopic`.
    pub fn publication(topic: &str) -> BusResult<Self> {
        if topic.contains(WILDCARD) {
            return Err(BusError::InvalidPublishTopic {
                topic: topic.to_string(),
            });
        }
        Ok(Self::split(topic))
    }

    fn split(topic: &str) -> Self {
        Self {
            raw: topic.to_string(),
            segments: topic.split(DELIMITER).map(str::to_string).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Количество сегментов (глубина в дереве).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Заканчивается ли топик подписки на `*`.
    pub fn is_wildcard(&self) -> bool {
        self.last_segment() == WILDCARD
    }
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for TopicPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

pub(crate) fn invalid(topic: &str, reason: &str) -> BusError {
    BusError::InvalidTopic {
        topic: topic.to_string(),
        reason: reason.to_string(),
    }
}
