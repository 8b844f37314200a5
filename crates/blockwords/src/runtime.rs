//! Single-task dispatch runtime.
//!
//! All session state lives in one [`SessionCoordinator`] owned by one task,
//! so every inbound message and clock tick is handled to completion before
//! the next. The task talks to the rest of the process only through
//! channels:
//!
//! * inbound bus messages arrive on an unbounded channel from the transport
//! * outbound messages go to the [`Publisher`] task in production order
//! * the current epoch is shared with the publisher through a watch channel
//! * session events are broadcast to any number of listeners

use crate::config::RuntimeSettings;
use cube_session::transport::{BusMessage, PublisherStats};
use cube_session::types::Millis;
use cube_session::{
    decode, Dispatch, InboundMessage, Publisher, SessionCoordinator, SessionEvent, ShutdownState,
    Transport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Handles to a running pipeline.
pub struct Pipeline {
    pub dispatcher: JoinHandle<()>,
    pub publisher: JoinHandle<PublisherStats>,
    pub events: broadcast::Sender<SessionEvent>,
}

/// Spawns the dispatch and publish tasks.
///
/// # Arguments
///
/// * `coordinator` - Session state, moved into the dispatch task
/// * `transport` - Bus the publisher writes to
/// * `inbound` - Messages received from the bus
/// * `reconnects` - Bumped by the transport on every (re)connect
/// * `settings` - Tick interval and event buffer size
/// * `queue_capacity` - Outbound queue length
/// * `force_start` - Start a session right after boot
/// * `shutdown` - Stops dispatch when initiated; completed by the publisher
#[allow(clippy::too_many_arguments)]
pub fn spawn_pipeline<T: Transport + 'static>(
    coordinator: SessionCoordinator,
    transport: Arc<T>,
    inbound: mpsc::UnboundedReceiver<BusMessage>,
    reconnects: Option<watch::Receiver<u64>>,
    settings: &RuntimeSettings,
    queue_capacity: usize,
    force_start: bool,
    shutdown: ShutdownState,
) -> Pipeline {
    let (epoch_tx, epoch_rx) = watch::channel(coordinator.epoch());
    let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
    let (events, _) = broadcast::channel(settings.event_buffer.max(1));

    let mut publisher = Publisher::new(transport, epoch_rx);
    if let Some(reconnects) = reconnects {
        publisher = publisher.with_reconnects(reconnects);
    }
    let publisher = tokio::spawn(publisher.run(queue_rx, shutdown.clone()));

    let runtime = SessionRuntime {
        coordinator,
        outbound: queue_tx,
        epoch: epoch_tx,
        events: events.clone(),
        tick: Duration::from_millis(settings.tick_interval_ms.max(1)),
        started: Instant::now(),
    };
    let dispatcher = tokio::spawn(runtime.run(inbound, force_start, shutdown));

    Pipeline {
        dispatcher,
        publisher,
        events,
    }
}

/// The dispatch loop. Owns the coordinator for the life of the process.
pub struct SessionRuntime {
    coordinator: SessionCoordinator,
    outbound: mpsc::Sender<cube_session::OutboundMessage>,
    epoch: watch::Sender<u64>,
    events: broadcast::Sender<SessionEvent>,
    tick: Duration,
    started: Instant,
}

impl SessionRuntime {
    /// Milliseconds since the runtime was created.
    fn now(&self) -> Millis {
        self.started.elapsed().as_millis() as Millis
    }

    /// Runs until shutdown is initiated or the inbound channel closes.
    ///
    /// Dropping the runtime at the end closes the outbound queue, which lets
    /// the publisher drain and finish.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<BusMessage>,
        force_start: bool,
        shutdown: ShutdownState,
    ) {
        let boot = self.coordinator.boot(self.now());
        if !self.forward(boot).await {
            return;
        }
        if force_start {
            let now = self.now();
            if let Ok(out) = self.coordinator.dispatch(InboundMessage::ForceStart, now) {
                if !self.forward(out).await {
                    return;
                }
            }
        }

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("🎯 Dispatch loop running (tick {:?})", self.tick);

        loop {
            let out = tokio::select! {
                _ = shutdown.initiated() => break,
                message = inbound.recv() => match message {
                    Some(message) => self.handle(message),
                    None => {
                        warn!("⚠️ Inbound channel closed");
                        break;
                    }
                },
                _ = interval.tick() => {
                    let now = self.now();
                    Some(self.coordinator.tick(now))
                }
            };
            if let Some(out) = out {
                if !self.forward(out).await {
                    break;
                }
            }
        }
        info!("🛑 Dispatch loop stopped at epoch {}", self.coordinator.epoch());
    }

    /// Decodes and dispatches one bus message. Undecodable and rejected
    /// messages are dropped.
    fn handle(&mut self, message: BusMessage) -> Option<Dispatch> {
        let decoded = match decode(&message.topic, &message.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("⚠️ {}", e);
                return None;
            }
        };
        let now = self.now();
        self.coordinator.dispatch(decoded, now).ok()
    }

    /// Publishes the epoch, queues the messages and broadcasts the events.
    ///
    /// # Returns
    ///
    /// `false` when the publisher is gone and dispatching is pointless.
    async fn forward(&mut self, out: Dispatch) -> bool {
        self.epoch.send_replace(self.coordinator.epoch());

        for message in out.messages {
            if self.outbound.send(message).await.is_err() {
                warn!("⚠️ Publisher stopped, ending dispatch");
                return false;
            }
        }
        for event in out.events {
            debug!(?event, "session event");
            // No listener is fine
            let _ = self.events.send(event);
        }
        true
    }
}
