//! Miniserver connection configuration.

use serde::Deserialize;
use url::Url;

use crate::error::MiniserverError;

/// Configuration for the HTTP connection to the Miniserver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiniserverConfig {
    /// Hostname, `host:port`, or a full base URL.
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MiniserverConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            username: "admin".to_string(),
            password: None,
            timeout_secs: 10,
        }
    }
}

impl MiniserverConfig {
    /// Base URL of the Miniserver; plain hosts get an `http://` scheme.
    ///
    /// # Errors
    ///
    /// Returns [`MiniserverError::InvalidUrl`] if the host does not form a
    /// valid URL.
    pub fn base_url(&self) -> Result<Url, MiniserverError> {
        let url = if self.host.contains("://") {
            Url::parse(&self.host)?
        } else {
            Url::parse(&format!("http://{}", self.host))?
        };
        Ok(url)
    }
}
