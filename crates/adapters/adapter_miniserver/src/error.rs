//! Miniserver adapter error types.

/// Errors returned by the Miniserver HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum MiniserverError {
    #[error("invalid Miniserver URL")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Miniserver URL cannot be a base")]
    CannotBeABase,

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("Miniserver returned HTTP {status}")]
    Status { status: u16 },

    /// The server accepted the request but refused the command.
    #[error("Miniserver rejected command with code {code}")]
    Rejected { code: String },
}
