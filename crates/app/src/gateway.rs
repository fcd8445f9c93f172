//! Gateway: drives one adaptor at a time between the device and the bus.
//!
//! Structure reloads replace the adaptor wholesale: the previous one is
//! aborted before the next is built, so stale routes never publish.

use loxbridge_domain::structure::SharedStructure;
use loxbridge_domain::value::StateValue;

use crate::adaptor::Adaptor;
use crate::config::{AdaptorConfig, GatewayConfig};
use crate::ports::{DeviceCommandSink, PublishSink};

/// Bus subscription changes that follow a structure load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionDelta {
    /// Every pattern of the new adaptor.
    pub subscribe: Vec<String>,
    /// Patterns of the previous adaptor the new one no longer listens on.
    pub unsubscribe: Vec<String>,
}

/// Owns the current [`Adaptor`] plus both outbound sinks.
pub struct Gateway<P, D> {
    config: GatewayConfig,
    adaptor_config: AdaptorConfig,
    publisher: P,
    device: D,
    adaptor: Option<Adaptor<P>>,
}

impl<P, D> Gateway<P, D>
where
    P: PublishSink + Clone,
    D: DeviceCommandSink,
{
    pub fn new(
        config: GatewayConfig,
        adaptor_config: AdaptorConfig,
        publisher: P,
        device: D,
    ) -> Self {
        Self {
            config,
            adaptor_config,
            publisher,
            device,
            adaptor: None,
        }
    }

    /// Replace the current adaptor with one bound to `structure`.
    ///
    /// Returns the patterns the bus must listen on and those of the previous
    /// adaptor it must drop.
    pub fn load_structure(&mut self, structure: SharedStructure) -> SubscriptionDelta {
        let previous_patterns = self.subscriptions();
        if let Some(mut previous) = self.adaptor.take() {
            tracing::info!("structure reloaded, aborting previous adaptor");
            previous.abort();
        }

        let adaptor = Adaptor::new(structure, &self.adaptor_config, self.publisher.clone());
        if self.config.publish_structure {
            adaptor.publish_structure();
        }
        let subscribe = adaptor.topics_for_subscription();
        self.adaptor = Some(adaptor);

        let unsubscribe = previous_patterns
            .into_iter()
            .filter(|pattern| !subscribe.contains(pattern))
            .collect();
        SubscriptionDelta {
            subscribe,
            unsubscribe,
        }
    }

    /// Subscription patterns of the current adaptor, empty when none.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.adaptor
            .as_ref()
            .map(Adaptor::topics_for_subscription)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn adaptor(&self) -> Option<&Adaptor<P>> {
        self.adaptor.as_ref()
    }

    /// A value arrived from the device.
    pub fn handle_device_update(&self, uuid: &str, value: StateValue) {
        match &self.adaptor {
            Some(adaptor) => adaptor.set_value_for_uuid(uuid, value),
            None => tracing::debug!(uuid, "no structure loaded, dropping value"),
        }
    }

    /// A message arrived from the bus.
    pub fn handle_bus_message(&self, topic: &str, payload: &[u8]) {
        let Some(adaptor) = &self.adaptor else {
            tracing::debug!(topic, "no structure loaded, dropping message");
            return;
        };
        let payload = String::from_utf8_lossy(payload);
        let Some(command) = adaptor.command_from_topic(topic, &payload) else {
            return;
        };

        if self.config.readonly {
            tracing::info!(
                action_id = %command.action_id,
                command = %command.command,
                "readonly mode, command not forwarded"
            );
            return;
        }

        tracing::debug!(
            action_id = %command.action_id,
            command = %command.command,
            "forwarding command to device"
        );
        self.device.send_command(command);
    }

    /// Abort the current adaptor; later calls are no-ops.
    pub fn shutdown(&mut self) {
        if let Some(mut adaptor) = self.adaptor.take() {
            adaptor.abort();
            tracing::info!("adaptor aborted");
        }
    }
}
