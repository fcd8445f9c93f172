//! Error types for structure parsing.

/// A single structure field that failed type validation.
///
/// Parsing never stops on these; they are handed to the caller's validation
/// callback and the offending item (or optional field) is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid field `{path}`: expected {expected}")]
pub struct InvalidField {
    /// Dotted path of the field inside the structure document,
    /// e.g. `controls.0f1e.name`.
    pub path: String,
    /// Human readable description of what was expected.
    pub expected: &'static str,
}

impl InvalidField {
    pub(crate) fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// Errors that make a structure document unusable as a whole.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    /// The raw bytes are not valid JSON.
    #[error("failed to parse structure document")]
    Json(#[from] serde_json::Error),

    /// The document root is not a JSON object.
    #[error("structure document is not a JSON object")]
    NotAnObject,

    /// `msInfo.serialNr` is missing; without it no topic can be built.
    #[error("structure document has no device serial number")]
    MissingSerial,
}
