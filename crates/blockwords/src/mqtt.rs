//! MQTT transport built on `rumqttc`.
//!
//! [`MqttTransport`] implements the session [`Transport`] over an
//! `AsyncClient`. The matching `EventLoop` is driven by
//! [`drive_event_loop`], which forwards incoming publishes as
//! [`BusMessage`]s and resubscribes after every (re)connect.

use crate::config::BrokerSettings;
use async_trait::async_trait;
use cube_session::messaging::topics;
use cube_session::transport::BusMessage;
use cube_session::{Transport, TransportError};
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

/// Session transport over an MQTT broker.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Creates the client and its event loop. Nothing is sent until the
    /// event loop is polled.
    pub fn connect(settings: &BrokerSettings) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_s.max(1)));
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, settings.channel_capacity);
        info!(
            "🔌 MQTT client '{}' targeting {}:{}",
            settings.client_id, settings.host, settings.port
        );
        (Self { client }, eventloop)
    }

    /// Sends DISCONNECT so the broker drops the session cleanly.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("Disconnect request not delivered: {}", e);
        }
    }

    /// Queues SUBSCRIBE for every inbound topic without waiting on the
    /// request channel, so it is safe to call from the event loop task.
    fn resubscribe(&self) {
        for filter in topics::SUBSCRIPTIONS {
            if let Err(e) = self.client.try_subscribe(filter, QoS::AtLeastOnce) {
                warn!("⚠️ Could not subscribe to {}: {}", filter, e);
            }
        }
    }
}

fn publish_error(topic: &str, e: ClientError) -> TransportError {
    TransportError::Publish {
        topic: topic.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
            .await
            .map_err(|e| publish_error(topic, e))
    }

    async fn subscribe(&self, filter: &str) -> Result<(), TransportError> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::Subscribe {
                filter: filter.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Polls the MQTT event loop forever.
///
/// Incoming publishes are forwarded to `inbound`. Every CONNACK triggers a
/// resubscribe and bumps `reconnects`. Connection errors are logged and
/// polling resumes after `retry`; `rumqttc` reconnects on the next poll.
///
/// The loop keeps polling after `inbound` closes so queued outbound
/// messages still reach the broker during shutdown. Abort the task once the
/// publisher has finished.
pub async fn drive_event_loop(
    mut eventloop: EventLoop,
    transport: MqttTransport,
    inbound: mpsc::UnboundedSender<BusMessage>,
    reconnects: watch::Sender<u64>,
    retry: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("🔗 Connected to broker ({:?})", ack.code);
                transport.resubscribe();
                reconnects.send_modify(|n| *n += 1);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = BusMessage::new(
                    publish.topic.clone(),
                    publish.payload.to_vec(),
                    publish.retain,
                );
                if inbound.send(message).is_err() {
                    trace!("Dropping {} after dispatch stopped", publish.topic);
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!("🔔 Subscription {} acknowledged", ack.pkid);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("⚠️ Broker connection error: {}; retrying in {:?}", e, retry);
                tokio::time::sleep(retry).await;
            }
        }
    }
}
