//! # loxbridge-adapter-miniserver
//!
//! Miniserver adapter: the device side of the bridge, over HTTP.
//!
//! ## Responsibilities
//! - Download the structure file (`/data/LoxAPP3.json`)
//! - Send commands (`/jdev/sps/io/<action>/<command>`)
//! - Implement the [`DeviceCommandSink`] port for the gateway
//!
//! Live value updates travel over the Miniserver's websocket, which this
//! adapter does not speak.

pub mod config;
pub mod error;

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use loxbridge_app::ports::{Command, DeviceCommandSink};

pub use config::MiniserverConfig;
pub use error::MiniserverError;

const STRUCTURE_PATH: [&str; 2] = ["data", "LoxAPP3.json"];
const COMMAND_PATH: [&str; 3] = ["jdev", "sps", "io"];

/// `{"LL": {"Code": "200", ...}}` envelope of `jdev` responses.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "LL")]
    ll: EnvelopeBody,
}

#[derive(Deserialize)]
struct EnvelopeBody {
    #[serde(rename = "Code", alias = "code")]
    code: Option<serde_json::Value>,
}

/// HTTP client for one Miniserver.
#[derive(Debug, Clone)]
pub struct MiniserverClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: Option<String>,
}

impl MiniserverClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &MiniserverConfig) -> Result<Self, MiniserverError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(
            http,
            config.base_url()?,
            config.username.clone(),
            config.password.clone(),
        ))
    }

    /// Build a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Download the structure file as raw JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a body
    /// that is not JSON.
    pub async fn fetch_structure(&self) -> Result<serde_json::Value, MiniserverError> {
        let url = self.url(STRUCTURE_PATH)?;
        tracing::debug!(%url, "fetching structure file");
        let response = self.get(url).await?;
        Ok(response.json().await?)
    }

    /// Send one command to a control.
    ///
    /// `/` inside the action identifier or the command separates path
    /// segments, as the Miniserver expects for sub-controls and
    /// parameterised commands; every segment is percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// response code other than 200.
    pub async fn send_command(&self, command: &Command) -> Result<(), MiniserverError> {
        let url = self.command_url(command)?;
        tracing::debug!(%url, "sending command");
        let response = self.get(url).await?;
        let body = response.text().await?;

        let code = serde_json::from_str::<Envelope>(&body)
            .ok()
            .and_then(|envelope| envelope.ll.code)
            .map(|code| match code {
                serde_json::Value::String(code) => code,
                other => other.to_string(),
            });
        match code {
            Some(code) if code != "200" => Err(MiniserverError::Rejected { code }),
            _ => Ok(()),
        }
    }

    fn command_url(&self, command: &Command) -> Result<Url, MiniserverError> {
        let segments = COMMAND_PATH
            .into_iter()
            .chain(command.action_id.split('/'))
            .chain(command.command.split('/'));
        self.url(segments)
    }

    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, MiniserverError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| MiniserverError::CannotBeABase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, MiniserverError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, self.password.as_deref())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MiniserverError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl DeviceCommandSink for MiniserverClient {
    /// Spawn the request on the current runtime; failures are logged.
    fn send_command(&self, command: Command) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(action_id = %command.action_id, "no async runtime, command dropped");
            return;
        };
        let client = self.clone();
        runtime.spawn(async move {
            if let Err(err) = MiniserverClient::send_command(&client, &command).await {
                tracing::error!(
                    action_id = %command.action_id,
                    command = %command.command,
                    error = %err,
                    "failed to send command"
                );
            }
        });
    }
}
