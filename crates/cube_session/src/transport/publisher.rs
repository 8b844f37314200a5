//! Outbound publisher: the only task that writes to the bus.
//!
//! Messages produced by the coordinator are queued on a channel and written
//! here in order. Two filters sit in front of the transport:
//!
//! * messages from an epoch older than the current one are dropped, so a
//!   reset never races with display updates queued before it
//! * a retained message whose payload equals the last one sent on the same
//!   topic is skipped, since the broker already holds it

use super::bus::Transport;
use crate::error::TransportError;
use crate::messaging::OutboundMessage;
use crate::shutdown::ShutdownState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

/// What happened to one outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    /// Retained payload identical to the one the broker already holds.
    Deduplicated,
    /// Produced before the latest reset.
    Stale,
}

/// Running totals kept by a [`Publisher`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublisherStats {
    pub sent: u64,
    pub deduplicated: u64,
    pub stale: u64,
    pub failed: u64,
}

pub struct Publisher<T: Transport> {
    transport: Arc<T>,
    retained: HashMap<String, String>,
    epoch: watch::Receiver<u64>,
    reconnects: Option<watch::Receiver<u64>>,
    stats: PublisherStats,
}

impl<T: Transport> Publisher<T> {
    /// Creates a publisher writing to `transport`.
    ///
    /// # Arguments
    ///
    /// * `transport` - Bus connection shared with the inbound side
    /// * `epoch` - Current coordinator epoch, updated on every reset
    pub fn new(transport: Arc<T>, epoch: watch::Receiver<u64>) -> Self {
        Self {
            transport,
            retained: HashMap::new(),
            epoch,
            reconnects: None,
            stats: PublisherStats::default(),
        }
    }

    /// Forgets the retained cache whenever `reconnects` changes, since the
    /// broker may have lost its retained state while the link was down.
    pub fn with_reconnects(mut self, reconnects: watch::Receiver<u64>) -> Self {
        self.reconnects = Some(reconnects);
        self
    }

    /// Publishes one message unless it is stale or a retained duplicate.
    ///
    /// The retained cache is only updated after the transport accepted the
    /// message, so a failed publish is retried by the next identical one.
    pub async fn publish(
        &mut self,
        message: &OutboundMessage,
    ) -> Result<PublishOutcome, TransportError> {
        if let Some(reconnects) = self.reconnects.as_mut() {
            if reconnects.has_changed().unwrap_or(false) {
                reconnects.borrow_and_update();
                self.forget_retained();
            }
        }

        let current = *self.epoch.borrow();
        if message.epoch < current {
            self.stats.stale += 1;
            trace!("🗑️ Dropping stale {} (epoch {} < {})", message, message.epoch, current);
            return Ok(PublishOutcome::Stale);
        }

        if message.retain && self.retained.get(&message.topic) == Some(&message.payload) {
            self.stats.deduplicated += 1;
            return Ok(PublishOutcome::Deduplicated);
        }

        if let Err(e) = self
            .transport
            .publish(&message.topic, message.payload.as_bytes(), message.retain)
            .await
        {
            self.stats.failed += 1;
            return Err(e);
        }

        if message.retain {
            self.retained
                .insert(message.topic.clone(), message.payload.clone());
        }
        self.stats.sent += 1;
        debug!("📤 {}", message);
        Ok(PublishOutcome::Sent)
    }

    /// Forgets what the broker is believed to hold. Called after a
    /// reconnect, when retained state may have been lost.
    pub fn forget_retained(&mut self) {
        if !self.retained.is_empty() {
            debug!("🧽 Forgetting {} retained payload(s)", self.retained.len());
        }
        self.retained.clear();
    }

    pub fn stats(&self) -> PublisherStats {
        self.stats
    }

    /// Publishes queued messages until every sender is dropped, then marks
    /// shutdown complete.
    ///
    /// Publish failures are logged and the message is dropped; the periodic
    /// letter rebroadcast repairs cube displays that missed an update.
    pub async fn run(
        mut self,
        mut queue: mpsc::Receiver<OutboundMessage>,
        shutdown: ShutdownState,
    ) -> PublisherStats {
        info!("📤 Publisher started");
        while let Some(message) = queue.recv().await {
            if let Err(e) = self.publish(&message).await {
                warn!("⚠️ {}", e);
            }
        }

        let stats = self.stats;
        info!(
            "📤 Publisher stopped: {} sent, {} deduplicated, {} stale, {} failed",
            stats.sent, stats.deduplicated, stats.stale, stats.failed
        );
        shutdown.complete_shutdown();
        stats
    }
}
