//! Publish/subscribe bus abstraction.
//!
//! The session only ever talks to a [`Transport`]. Inbound traffic arrives
//! as [`BusMessage`]s on a channel handed out when the transport is built, so
//! the dispatch task owns the only consumer.

use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

/// One message as seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        }
    }
}

/// Outbound side of a publish/subscribe bus.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publishes `payload` on `topic`. Retained messages are kept by the bus
    /// and replayed to later subscribers.
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError>;

    /// Starts delivering messages matching `filter` (`+` and `#` wildcards).
    async fn subscribe(&self, filter: &str) -> Result<(), TransportError>;
}

/// Whether an MQTT-style `filter` matches `topic`.
///
/// `+` matches exactly one level, a trailing `#` matches any remainder.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    filters: Vec<String>,
    published: Vec<BusMessage>,
    retained: HashMap<String, Vec<u8>>,
    offline: bool,
}

/// In-process bus with broker semantics: retained messages, wildcard
/// subscriptions and a full publish log. Used by tests and local runs.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    state: Arc<RwLock<BusState>>,
    inbound: mpsc::UnboundedSender<BusMessage>,
}

impl MemoryBus {
    /// Creates a bus and the receiver subscribed messages arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BusMessage>) {
        let (inbound, receiver) = mpsc::unbounded_channel();
        let bus = Self {
            state: Arc::new(RwLock::new(BusState::default())),
            inbound,
        };
        (bus, receiver)
    }

    /// Delivers a message as if another client had published it.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a subscription matched and the message was queued,
    /// `Ok(false)` if nothing is subscribed to `topic`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] when the inbound receiver has been dropped.
    pub async fn inject(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        retain: bool,
    ) -> Result<bool, TransportError> {
        let message = BusMessage::new(topic, payload, retain);
        let mut state = self.state.write().await;
        if retain {
            state.retained.insert(message.topic.clone(), message.payload.clone());
        }
        let subscribed = state.filters.iter().any(|f| topic_matches(f, topic));
        drop(state);

        if !subscribed {
            return Ok(false);
        }
        trace!("📨 Injected {}", topic);
        self.inbound
            .send(message)
            .map(|_| true)
            .map_err(|_| TransportError::Closed(format!("no receiver for {topic}")))
    }

    /// Everything published through [`Transport::publish`], oldest first.
    pub async fn published(&self) -> Vec<BusMessage> {
        self.state.read().await.published.clone()
    }

    /// Last retained payload on `topic`.
    pub async fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.state.read().await.retained.get(topic).cloned()
    }

    /// Simulates losing the broker: publishes fail until set back online.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }
}

#[async_trait]
impl Transport for MemoryBus {
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        if state.offline {
            return Err(TransportError::Publish {
                topic: topic.to_string(),
                reason: "bus offline".to_string(),
            });
        }
        let message = BusMessage::new(topic, payload.to_vec(), retain);
        if retain {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state.retained.insert(topic.to_string(), payload.to_vec());
            }
        }
        state.published.push(message);
        Ok(())
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        if state.offline {
            return Err(TransportError::Subscribe {
                filter: filter.to_string(),
                reason: "bus offline".to_string(),
            });
        }
        state.filters.push(filter.to_string());

        // Replay retained messages like a broker would
        for (topic, payload) in &state.retained {
            if topic_matches(filter, topic) {
                let _ = self
                    .inbound
                    .send(BusMessage::new(topic.clone(), payload.clone(), true));
            }
        }
        debug!("🔔 Subscribed to {}", filter);
        Ok(())
    }
}
