#![allow(dead_code)]

use std::time::Duration;

use tokio::{sync::mpsc, time::timeout};
use topicbus::Event;

/// Сколько ждать события, которое должно прийти.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);
/// Сколько ждать, прежде чем решить, что событие не придёт.
pub const SILENCE: Duration = Duration::from_millis(100);

pub async fn expect_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(DELIVERY_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("endpoint channel closed")
}

pub async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<Event>) {
    if let Ok(Some(event)) = timeout(SILENCE, rx.recv()).await {
        panic!("unexpected event on topic {}", event.topic());
    }
}

