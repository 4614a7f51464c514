use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

pub const TOPIC_SETTINGS: &str = "settings";
pub const TOPIC_CAPABILITIES: &str = "capabilities";

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub payload: JsonValue,
}

/// In-process publish/subscribe hub: topic name to broadcast channel.
/// Components that used to poll reference rows subscribe here instead.
#[derive(Clone)]
pub struct EventHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Event>>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Event> {
        let mut topics = self.topics.lock().expect("event hub mutex poisoned");
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    /// Delivers to current subscribers; a topic nobody listens on is fine.
    pub fn publish(&self, topic: &str, payload: JsonValue) {
        let event = Event {
            topic: topic.to_string(),
            payload,
        };
        let _ = self.sender(topic).send(event);
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe(TOPIC_SETTINGS);
        hub.publish(TOPIC_SETTINGS, json!({"questions_percentage": 25}));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, TOPIC_SETTINGS);
        assert_eq!(event.payload["questions_percentage"], 25);
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe(TOPIC_CAPABILITIES);
        hub.publish(TOPIC_SETTINGS, json!({}));
        assert!(rx.try_recv().is_err());
    }
}
