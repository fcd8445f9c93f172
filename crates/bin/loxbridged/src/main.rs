//! # loxbridged: loxbridge daemon
//!
//! Composition root that wires the Miniserver and the MQTT broker around the
//! gateway.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Load the structure document (Miniserver or local file), retrying until
//!   the first one is available
//! - Build the gateway, injecting the broker as publish sink and the
//!   Miniserver as command sink
//! - Renew subscriptions on every broker (re)connect
//! - Reload the structure periodically when configured, dropping
//!   subscriptions the new structure no longer needs
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod source;

use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use loxbridge_adapter_miniserver::MiniserverClient;
use loxbridge_adapter_mqtt::{BusEvent, MqttBus, run_event_loop};
use loxbridge_app::gateway::{Gateway, SubscriptionDelta};

use crate::config::{Config, SourceConfig};

const BUS_EVENT_CAPACITY: usize = 256;

type BridgeGateway = Gateway<MqttBus, MiniserverClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let miniserver =
        MiniserverClient::new(&config.miniserver).context("failed to build Miniserver client")?;
    let (bus, event_loop) = MqttBus::new(&config.mqtt).context("failed to build MQTT client")?;

    let (events_tx, mut events) = mpsc::channel(BUS_EVENT_CAPACITY);
    let event_task = tokio::spawn(run_event_loop(
        event_loop,
        events_tx,
        Duration::from_secs(config.mqtt.reconnect_delay_secs),
    ));

    let mut gateway = Gateway::new(
        config.gateway.clone(),
        config.adaptor.clone(),
        bus.clone(),
        miniserver.clone(),
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let retry_delay = Duration::from_secs(config.source.retry_delay_secs);
    let first_load = source::load_until_ready(&config.source, &miniserver, retry_delay);
    let mut document = tokio::select! {
        (document, structure) = first_load => {
            gateway.load_structure(structure);
            document
        }
        _ = &mut shutdown => {
            tracing::info!("shutting down before the structure was loaded");
            event_task.abort();
            return Ok(());
        }
    };

    let mut reload = (config.source.reload_interval_secs > 0).then(|| {
        let period = Duration::from_secs(config.source.reload_interval_secs);
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    tracing::info!(
        mqtt = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        readonly = config.gateway.readonly,
        "loxbridged running"
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(BusEvent::Connected) => subscribe(&bus, &gateway.subscriptions()).await,
                Some(BusEvent::Message(message)) => {
                    gateway.handle_bus_message(&message.topic, &message.payload);
                }
                None => {
                    tracing::error!("MQTT event loop stopped");
                    break;
                }
            },
            () = tick(reload.as_mut()) => {
                if let Some((next, delta)) =
                    reload_structure(&config.source, &miniserver, &document, &mut gateway).await
                {
                    document = next;
                    apply_subscriptions(&bus, &delta).await;
                }
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "failed to listen for shutdown signal");
                }
                tracing::info!("shutting down");
                break;
            }
        }
    }

    gateway.shutdown();
    if let Err(err) = bus.disconnect().await {
        tracing::warn!(error = %err, "failed to disconnect from broker");
    }
    event_task.abort();
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?}: {err}, falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Re-read the structure and swap the adaptor when the document changed.
///
/// Returns the new document and the subscription changes on swap; failures
/// keep the current adaptor.
async fn reload_structure(
    source_config: &SourceConfig,
    miniserver: &MiniserverClient,
    current: &serde_json::Value,
    gateway: &mut BridgeGateway,
) -> Option<(serde_json::Value, SubscriptionDelta)> {
    let document = match source::fetch_document(source_config, miniserver).await {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "structure reload failed");
            return None;
        }
    };
    if &document == current {
        tracing::debug!("structure unchanged");
        return None;
    }
    match source::parse_structure(&document) {
        Ok(structure) => {
            let delta = gateway.load_structure(structure);
            Some((document, delta))
        }
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "reloaded structure is invalid");
            None
        }
    }
}

async fn apply_subscriptions(bus: &MqttBus, delta: &SubscriptionDelta) {
    if let Err(err) = bus.unsubscribe(&delta.unsubscribe).await {
        tracing::error!(error = %err, "failed to drop retired command topics");
    }
    subscribe(bus, &delta.subscribe).await;
}

async fn subscribe(bus: &MqttBus, patterns: &[String]) {
    if let Err(err) = bus.subscribe(patterns).await {
        tracing::error!(error = %err, "failed to subscribe to command topics");
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
