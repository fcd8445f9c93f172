//! # loxbridge-adapter-mqtt
//!
//! MQTT adapter: the broker side of the topic bus.
//!
//! ## Responsibilities
//! - Connect to an MQTT broker
//! - Publish adaptor [`Publication`]s without blocking the caller
//! - Subscribe to the adaptor's command patterns, and drop the ones a
//!   reloaded structure no longer uses
//! - Forward inbound messages to the driver loop
//!
//! ## Dependency rule
//! Depends on `loxbridge-app` for the [`PublishSink`] port only.

pub mod config;
pub mod error;

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use loxbridge_app::ports::{Publication, PublishSink};

pub use config::MqttConfig;
pub use error::MqttError;

/// Capacity of the request queue between client handles and the event loop.
const REQUESTS_CAP: usize = 64;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// What the event loop reports to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// The broker accepted the connection; subscriptions must be renewed.
    Connected,
    Message(InboundMessage),
}

/// Cloneable handle to the broker connection.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    qos: QoS,
}

impl MqttBus {
    /// Create the client handle and the event loop that drives it.
    ///
    /// Nothing touches the network until the event loop is polled.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidQos`] when the configured level is invalid.
    pub fn new(config: &MqttConfig) -> Result<(Self, EventLoop), MqttError> {
        let qos = config.qos()?;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        options.set_max_packet_size(config.max_packet_size, config.max_packet_size);
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.as_deref().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(options, REQUESTS_CAP);
        tracing::info!(host = %config.host, port = config.port, "MQTT client created");
        Ok((Self { client, qos }, event_loop))
    }

    /// Subscribe to every pattern, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request queue is closed.
    pub async fn subscribe(&self, patterns: &[String]) -> Result<(), MqttError> {
        for pattern in patterns {
            self.client.subscribe(pattern, self.qos).await?;
            tracing::debug!(%pattern, "subscribed");
        }
        Ok(())
    }

    /// Unsubscribe from every pattern, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request queue is closed.
    pub async fn unsubscribe(&self, patterns: &[String]) -> Result<(), MqttError> {
        for pattern in patterns {
            self.client.unsubscribe(pattern).await?;
            tracing::debug!(%pattern, "unsubscribed");
        }
        Ok(())
    }

    /// Send a disconnect request to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::Client`] if the request queue is closed.
    pub async fn disconnect(&self) -> Result<(), MqttError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

impl PublishSink for MqttBus {
    fn publish(&self, publication: Publication) {
        let Publication {
            topic,
            payload,
            retain,
        } = publication;
        if let Err(err) = self.client.try_publish(&topic, self.qos, retain, payload) {
            tracing::warn!(%topic, error = %err, "failed to queue publication");
        }
    }
}

/// Drive the connection until the receiving side of `events` is dropped.
///
/// Connection errors are logged and retried after `reconnect_delay`;
/// rumqttc reconnects on the next poll.
pub async fn run_event_loop(
    mut event_loop: EventLoop,
    events: mpsc::Sender<BusEvent>,
    reconnect_delay: Duration,
) {
    loop {
        match event_loop.poll().await {
            Ok(event) => {
                let Some(event) = translate(event) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    tracing::debug!("bus event receiver dropped, stopping event loop");
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "MQTT connection error, retrying");
                if events.is_closed() {
                    return;
                }
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }
}

fn translate(event: Event) -> Option<BusEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => {
            tracing::info!("MQTT connection acknowledged");
            Some(BusEvent::Connected)
        }
        Event::Incoming(Packet::Publish(publish)) => Some(BusEvent::Message(InboundMessage {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
        })),
        _ => None,
    }
}
