//! Adaptor and gateway configuration.

use serde::Deserialize;

/// How a control's identifier is folded into its topic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicLayout {
    /// `prefix/serial/control`
    #[default]
    Hierarchical,
    /// `prefix/serial-control`
    Flat,
}

/// How many topics a control's states are spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One topic per state (and per list element).
    #[default]
    PerState,
    /// One topic per control; payloads are JSON objects keyed by state.
    PerDevice,
}

/// Shape of the `categories`/`rooms`/`controls` sections in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogLayout {
    /// Name-sorted arrays.
    #[default]
    List,
    /// Objects keyed by identifier.
    Map,
}

/// Topic prefixes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Prefixes {
    /// Namespace for device-originated topics and commands.
    pub device: String,
    /// Namespace for the catalog; falls back to `device` when unset.
    pub catalog: Option<String>,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            device: "lox".to_string(),
            catalog: None,
        }
    }
}

impl Prefixes {
    /// The effective catalog prefix.
    #[must_use]
    pub fn catalog(&self) -> &str {
        self.catalog.as_deref().unwrap_or(&self.device)
    }
}

/// Configuration for building an [`Adaptor`](crate::adaptor::Adaptor).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdaptorConfig {
    pub prefixes: Prefixes,
    /// Base path or URL that icon references are resolved against.
    pub icon_path: String,
    pub topic_layout: TopicLayout,
    pub granularity: Granularity,
    pub catalog_layout: CatalogLayout,
}

/// Configuration for the [`Gateway`](crate::gateway::Gateway) driver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Resolve inbound commands but never forward them to the device.
    pub readonly: bool,
    /// Publish the catalog after every structure load.
    pub publish_structure: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            readonly: false,
            publish_structure: true,
        }
    }
}
