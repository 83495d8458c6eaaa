use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Сохранённое событие в том виде, в каком его отдаёт хранилище.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Монотонный идентификатор, выдаётся хранилищем при вставке.
    pub id: u64,
    pub topic: String,
    /// Payload события, сериализованный в JSON.
    pub payload_json: String,
    pub created_at: DateTime<Utc>,
}

/// Запись, ещё не получившая идентификатор.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventRecord {
    pub topic: String,
    pub payload_json: String,
    pub created_at: DateTime<Utc>,
}

impl NewEventRecord {
    pub fn new(
        topic: impl Into<String>,
        payload_json: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload_json: payload_json.into(),
            created_at,
        }
    }

    pub(crate) fn with_id(
        self,
        id: u64,
    ) -> EventRecord {
        EventRecord {
            id,
            topic: self.topic,
            payload_json: self.payload_json,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = NewEventRecord::new("orders:create", "{\"id\":1}", at).with_id(7);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"topic":"orders:create","payload_json":"{\"id\":1}","created_at":"2024-05-01T10:00:00Z"}"#
        );

        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
