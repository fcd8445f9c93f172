//! Structure document loading from the Miniserver or a local file.

use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

use loxbridge_adapter_miniserver::MiniserverClient;
use loxbridge_domain::structure::{SharedStructure, Structure};

use crate::config::SourceConfig;

/// Fetch and parse the structure, retrying every `retry_delay` until both
/// succeed.
pub async fn load_until_ready(
    source: &SourceConfig,
    miniserver: &MiniserverClient,
    retry_delay: Duration,
) -> (Value, SharedStructure) {
    loop {
        match load(source, miniserver).await {
            Ok(loaded) => return loaded,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    retry_in = ?retry_delay,
                    "structure not available yet"
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

/// Fetch and parse the structure once.
///
/// # Errors
///
/// Returns an error when the document cannot be read or is not a structure.
pub async fn load(
    source: &SourceConfig,
    miniserver: &MiniserverClient,
) -> anyhow::Result<(Value, SharedStructure)> {
    let document = fetch_document(source, miniserver)
        .await
        .context("failed to load structure")?;
    let structure = parse_structure(&document).context("failed to parse structure")?;
    Ok((document, structure))
}

/// Read the raw structure document.
///
/// # Errors
///
/// Returns an error when the file or the Miniserver cannot be read.
pub async fn fetch_document(
    source: &SourceConfig,
    miniserver: &MiniserverClient,
) -> anyhow::Result<Value> {
    match &source.structure_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "reading structure file");
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        None => {
            tracing::info!(url = %miniserver.base_url(), "fetching structure from Miniserver");
            Ok(miniserver.fetch_structure().await?)
        }
    }
}

/// Parse a structure document, logging skipped fields.
///
/// # Errors
///
/// Returns an error when the document has no usable device identity.
pub fn parse_structure(document: &Value) -> anyhow::Result<SharedStructure> {
    let structure = Structure::from_json(document, |invalid| {
        tracing::warn!(%invalid, "skipping invalid structure field");
    })?;
    Ok(structure.into_shared())
}
