//! MQTT broker configuration.

use rumqttc::QoS;
use serde::Deserialize;

use crate::error::MqttError;

/// Configuration for the broker connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub host: String,
    /// MQTT broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Quality of service for publications and subscriptions (0, 1 or 2).
    pub qos: u8,
    /// Pause between reconnection attempts, in seconds.
    pub reconnect_delay_secs: u64,
    /// Largest packet accepted or sent; the catalog is a single message.
    pub max_packet_size: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "loxbridge".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            qos: 0,
            reconnect_delay_secs: 5,
            max_packet_size: 1024 * 1024,
        }
    }
}

impl MqttConfig {
    /// Configured quality of service.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::InvalidQos`] for levels above 2.
    pub fn qos(&self) -> Result<QoS, MqttError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(MqttError::InvalidQos(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.client_id, "loxbridge");
        assert!(config.username.is_none());
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.reconnect_delay_secs, 5);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            host = "mqtt.example.com"
            port = 8883
            client_id = "bridge-1"
            username = "lox"
            password = "secret"
            keep_alive_secs = 60
            qos = 1
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.host, "mqtt.example.com");
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id, "bridge-1");
        assert_eq!(config.username.as_deref(), Some("lox"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.qos().unwrap(), QoS::AtLeastOnce);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: MqttConfig = toml::from_str(r#"host = "192.168.1.100""#).unwrap();
        assert_eq!(config.host, "192.168.1.100");
        assert_eq!(config.port, 1883);
        assert_eq!(config.qos().unwrap(), QoS::AtMostOnce);
    }

    #[test]
    fn should_reject_unknown_qos_level() {
        let config = MqttConfig {
            qos: 3,
            ..MqttConfig::default()
        };
        assert!(matches!(config.qos(), Err(MqttError::InvalidQos(3))));
    }
}
